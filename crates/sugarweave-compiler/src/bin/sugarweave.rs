/// Sugarweave CLI

use std::path::{Path, PathBuf};
use std::process;
use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use sugarweave_compiler::logging::init_tracing;
use sugarweave_compiler::{dist, CompileError, CompileOptions, Compiler, Config, Decompiler};

#[derive(Parser, Debug)]
#[command(name = "sugarweave")]
#[command(about = "Compile a SugarCube story project into a Twine HTML file, and back")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to ./sugarweave.json when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the project into the output HTML file
    Compile {
        /// Production build: no dev bootstrap script, bundler build flags
        #[arg(long)]
        build: bool,
    },
    /// Compile in build mode and assemble the dist folder
    Build,
    /// Turn a compiled story back into project sources.
    ///
    /// DIR must contain exactly one HTML file. Every other file and folder
    /// in DIR is copied into the static folder, recursively.
    Decompile {
        /// Folder holding the story HTML and its assets
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };
    let delimiter = config.passage_format.meta_delimiter.clone();

    match args.command {
        Command::Compile { build } => {
            let options = CompileOptions::new(config).build_mode(build);
            let compiler = Compiler::new(options);
            match compiler.compile_to_file() {
                Ok(output) => {
                    println!("Story compiled successfully");
                    print_next_pid(&delimiter, output.next_pid);
                }
                Err(e) => fail("Compilation failed", &e),
            }
        }
        Command::Build => {
            let options = CompileOptions::new(config).build_mode(true);
            let compiler = Compiler::new(options);
            match dist::build_dist(&compiler) {
                Ok((output, html_path)) => {
                    println!("Story built: {}", html_path.display());
                    print_next_pid(&delimiter, output.next_pid);
                }
                Err(e) => fail("Build failed", &e),
            }
        }
        Command::Decompile { dir } => {
            let project_path = config.project_path.clone();
            let static_path = config.static_path.clone();
            match Decompiler::new(config).decompile_dir(&dir) {
                Ok(report) => {
                    if args.verbose {
                        for path in &report.passages {
                            println!("Wrote: {}", path.display());
                        }
                    }
                    println!(
                        "All files are decompiled and are in `{}` / `{}` folders",
                        project_path.display(),
                        static_path.display()
                    );
                }
                Err(e) if e.is_usage() => {
                    eprintln!("{}", e);
                    let mut cmd = Args::command();
                    if let Some(sub) = cmd.find_subcommand_mut("decompile") {
                        let _ = sub.print_long_help();
                    }
                    process::exit(1);
                }
                Err(e) => fail("Decompilation failed", &e),
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

fn print_next_pid(delimiter: &str, next_pid: Option<u32>) {
    println!("\n{}", delimiter);
    match next_pid {
        Some(pid) => println!(" Next available pid: {}", pid),
        None => println!(" No pid available: {} is taken", u32::MAX),
    }
    println!("{}", delimiter);
}

fn fail(context: &str, error: &CompileError) -> ! {
    eprintln!("{}: {}", context, error);
    process::exit(1);
}
