//! Built-in in-process solvers, one module per agent.
//!
//! - Day 0 (warm-up): blank-line separated groups of integers. Part 1 is the largest group
//!   sum, part 2 the sum of the three largest.
//! - Day 1: each line hides digits. Part 1 joins the first and last ASCII digit of each line
//!   into a two-digit number and sums them; part 2 also accepts spelled-out digits.

use crate::{
    puzzle::{Day, Part},
    registry::Registry,
};

pub mod alpha;
pub mod bravo;
pub mod charlie;

/// Registers every agent's solvers.
pub fn register_all(registry: &mut Registry) -> anyhow::Result<()> {
    alpha::register(registry)?;
    bravo::register(registry)?;
    charlie::register(registry)?;
    Ok(())
}

pub(crate) const DIGIT_WORDS: [&str; 9] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

pub(crate) fn register_days(
    registry: &mut Registry,
    agent: &str,
    days: &[(u8, crate::solver::SolveFn, crate::solver::SolveFn)],
) -> anyhow::Result<()> {
    for &(day, part1, part2) in days {
        let day = Day::new(day)?;
        registry
            .register(agent, day, Part::One, part1)
            .register(agent, day, Part::Two, part2);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod samples {
    pub const DAY0: &str = "1000\n2000\n3000\n\n4000\n\n5000\n6000\n\n7000\n8000\n9000\n\n10000\n";
    pub const DAY1_PART1: &str = "1abc2\npqr3stu8vwx\na1b2c3d4e5f\ntreb7uchet\n";
    pub const DAY1_PART2: &str = "two1nine\neightwothree\nabcone2threexyz\nxtwone3four\n\
                                  4nineeightseven2\nzoneight234\n7pqrstsixteen\n";
}
