/// Pid and position allocation for passages that lack them.
///
/// One allocator lives for exactly one compile run. Explicit pids and
/// positions are registered first; missing ones are then handed out in
/// passage order.

use std::collections::HashSet;

use crate::config::PassageFormat;

/// Grid coordinate of a passage on the story map.
pub type Point = (i64, i64);

/// Running state of one compile: the highest pid handed out so far and
/// every coordinate already taken.
#[derive(Debug, Clone)]
pub struct PassageAllocator {
    biggest_pid: u32,
    used: HashSet<Point>,
    delta: i64,
    max_position: i64,
}

impl PassageAllocator {
    pub fn new(format: &PassageFormat) -> Self {
        Self {
            biggest_pid: 0,
            used: HashSet::new(),
            delta: format.position_delta,
            max_position: format.max_position,
        }
    }

    /// Record an explicit pid. Must be called for every explicit pid
    /// before the first call to [`next_pid`](Self::next_pid).
    pub fn reserve_pid(&mut self, pid: u32) {
        self.biggest_pid = self.biggest_pid.max(pid);
    }

    /// Record an explicit `x,y` position. Returns `false` when the text is
    /// not a pair of numbers, in which case nothing is reserved.
    ///
    /// Non-integral coordinates can never collide with the grid, so they
    /// are accepted without being stored.
    pub fn reserve_position(&mut self, position: &str) -> bool {
        match parse_position(position) {
            Some((x, y)) => {
                if x.fract() == 0.0 && y.fract() == 0.0 {
                    self.used.insert((x as i64, y as i64));
                }
                true
            }
            None => false,
        }
    }

    /// Highest pid seen or assigned so far.
    pub fn biggest_pid(&self) -> u32 {
        self.biggest_pid
    }

    /// The pid the next passage without one would receive, or `None`
    /// once `u32::MAX` is taken.
    pub fn next_available_pid(&self) -> Option<u32> {
        self.biggest_pid.checked_add(1)
    }

    pub fn next_pid(&mut self) -> Option<u32> {
        let pid = self.next_available_pid()?;
        self.biggest_pid = pid;
        Some(pid)
    }

    /// Find the first free grid point, scanning rows left to right from
    /// `(0, 0)`, and mark it as used.
    pub fn next_position(&mut self) -> Point {
        let mut point = (0, 0);
        while self.used.contains(&point) {
            if point.0 + self.delta < self.max_position {
                point.0 += self.delta;
            } else {
                point.0 = 0;
                point.1 += self.delta;
            }
        }
        self.used.insert(point);
        point
    }
}

/// Parse `"x,y"` into two numbers. Whitespace around each part is allowed.
pub fn parse_position(text: &str) -> Option<(f64, f64)> {
    let (x, y) = text.split_once(',')?;
    let x: f64 = x.trim().parse().ok()?;
    let y: f64 = y.trim().parse().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

pub fn format_position(point: Point) -> String {
    format!("{},{}", point.0, point.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> PassageAllocator {
        PassageAllocator::new(&PassageFormat::default())
    }

    #[test]
    fn first_position_is_origin() {
        assert_eq!(allocator().next_position(), (0, 0));
    }

    #[test]
    fn skips_reserved_points() {
        let mut alloc = allocator();
        assert!(alloc.reserve_position("0,0"));
        assert!(alloc.reserve_position("300, 0"));
        assert_eq!(alloc.next_position(), (150, 0));
        assert_eq!(alloc.next_position(), (450, 0));
    }

    #[test]
    fn wraps_to_next_row_before_the_bound() {
        let mut alloc = allocator();
        let row: Vec<_> = (0..67).map(|_| alloc.next_position()).collect();
        assert_eq!(row[66], (9900, 0));
        assert_eq!(alloc.next_position(), (0, 150));
    }

    #[test]
    fn positions_are_distinct_and_on_grid() {
        let mut alloc = allocator();
        alloc.reserve_position("150,0");
        alloc.reserve_position("0,150");
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let (x, y) = alloc.next_position();
            assert!(seen.insert((x, y)));
            assert!(x % 150 == 0 && (0..=9900).contains(&x));
            assert!(y % 150 == 0 && y >= 0);
            assert!((x, y) != (150, 0) && (x, y) != (0, 150));
        }
    }

    #[test]
    fn allocation_is_deterministic() {
        let run = || {
            let mut alloc = allocator();
            alloc.reserve_position("0,0");
            alloc.reserve_position("450,0");
            (0..5).map(|_| alloc.next_position()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn off_grid_and_malformed_positions() {
        let mut alloc = allocator();
        assert!(alloc.reserve_position("12.5,40"));
        assert!(!alloc.reserve_position("left"));
        assert!(!alloc.reserve_position("1,2,3"));
        assert_eq!(alloc.next_position(), (0, 0));
    }

    #[test]
    fn pids_continue_after_the_largest_explicit_one() {
        let mut alloc = allocator();
        alloc.reserve_pid(7);
        alloc.reserve_pid(3);
        assert_eq!(alloc.next_available_pid(), Some(8));
        assert_eq!(alloc.next_pid(), Some(8));
        assert_eq!(alloc.next_pid(), Some(9));
        assert_eq!(alloc.next_available_pid(), Some(10));
    }

    #[test]
    fn pid_space_runs_out_without_overflow() {
        let mut alloc = allocator();
        alloc.reserve_pid(u32::MAX - 1);
        assert_eq!(alloc.next_pid(), Some(u32::MAX));
        assert_eq!(alloc.next_available_pid(), None);
        assert_eq!(alloc.next_pid(), None);
        assert_eq!(alloc.biggest_pid(), u32::MAX);
    }

    #[test]
    fn custom_grid_is_honored() {
        let format = PassageFormat {
            max_position: 300,
            position_delta: 100,
            ..PassageFormat::default()
        };
        let mut alloc = PassageAllocator::new(&format);
        let points: Vec<_> = (0..4).map(|_| alloc.next_position()).collect();
        assert_eq!(points, vec![(0, 0), (100, 0), (200, 0), (0, 100)]);
    }
}
