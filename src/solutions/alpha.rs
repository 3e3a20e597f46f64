//! Agent alpha: iterator chains, sort-based top three.

use anyhow::{anyhow, Context};

use super::{register_days, DIGIT_WORDS};
use crate::registry::Registry;

/// Registers alpha's solvers.
pub fn register(registry: &mut Registry) -> anyhow::Result<()> {
    register_days(
        registry,
        "alpha",
        &[(0, day0_part1, day0_part2), (1, day1_part1, day1_part2)],
    )
}

fn group_sums(input: &str) -> anyhow::Result<Vec<u64>> {
    input
        .split("\n\n")
        .filter(|group| !group.trim().is_empty())
        .map(|group| {
            group
                .lines()
                .map(|line| {
                    line.trim()
                        .parse::<u64>()
                        .with_context(|| format!("not a number: '{line}'"))
                })
                .sum::<anyhow::Result<u64>>()
        })
        .collect()
}

fn day0_part1(input: &str) -> anyhow::Result<String> {
    let max = group_sums(input)?
        .into_iter()
        .max()
        .ok_or_else(|| anyhow!("empty input"))?;
    Ok(max.to_string())
}

fn day0_part2(input: &str) -> anyhow::Result<String> {
    let mut sums = group_sums(input)?;
    sums.sort_unstable_by(|a, b| b.cmp(a));
    Ok(sums.iter().take(3).sum::<u64>().to_string())
}

fn calibration(line: &str, words: bool) -> Option<u32> {
    let digits: Vec<u32> = line
        .char_indices()
        .filter_map(|(i, c)| {
            if let Some(d) = c.to_digit(10) {
                return Some(d);
            }
            if !words {
                return None;
            }
            DIGIT_WORDS
                .iter()
                .position(|w| line[i..].starts_with(w))
                .map(|p| p as u32 + 1)
        })
        .collect();
    Some(digits.first()? * 10 + digits.last()?)
}

fn day1(input: &str, words: bool) -> anyhow::Result<String> {
    input
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| calibration(line, words).ok_or_else(|| anyhow!("no digit in '{line}'")))
        .sum::<anyhow::Result<u32>>()
        .map(|total| total.to_string())
}

fn day1_part1(input: &str) -> anyhow::Result<String> {
    day1(input, false)
}

fn day1_part2(input: &str) -> anyhow::Result<String> {
    day1(input, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solutions::samples;

    #[test]
    fn day0() {
        assert_eq!(day0_part1(samples::DAY0).unwrap(), "24000");
        assert_eq!(day0_part2(samples::DAY0).unwrap(), "45000");
        assert!(day0_part1("").is_err());
        assert!(day0_part1("12\nx\n").is_err());
    }

    #[test]
    fn day1() {
        assert_eq!(day1_part1(samples::DAY1_PART1).unwrap(), "142");
        assert_eq!(day1_part2(samples::DAY1_PART2).unwrap(), "281");
        assert!(day1_part1("abc\n").is_err());
    }
}
