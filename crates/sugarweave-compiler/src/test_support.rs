/// Shared fixtures for unit tests.

use crate::embed::StoryData;
use crate::passage::Passage;
use crate::project::{ProjectFile, ProjectInfo, Tag};

pub fn sample_project() -> ProjectFile {
    ProjectFile {
        info: ProjectInfo {
            name: "Tom & Jerry".into(),
            startnode: 1,
            creator: "Twine".into(),
            creator_version: "2.6.2".into(),
            ifid: "D674C58C-DEFA-4F70-B7A2-27742230C0FC".into(),
            zoom: 1.0,
            format: "SugarCube".into(),
            format_version: "2.36.1".into(),
            options: String::new(),
        },
        tags: vec![Tag {
            name: "dark".into(),
            color: "red".into(),
        }],
    }
}

pub fn sample_story() -> StoryData {
    StoryData {
        project: sample_project(),
        stylesheet: "body { color: red; }".into(),
        script: "Config.history.maxStates = 1;".into(),
        passages: vec![Passage {
            pid: 1,
            name: "Start".into(),
            tags: "intro".into(),
            position: "0,0".into(),
            size: "100,100".into(),
            content: "<<set $x to 1>> & [[Next]]".into(),
        }],
    }
}
