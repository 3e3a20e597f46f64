//! Agent bravo: single pass loops, no allocation.

use anyhow::bail;

use super::{register_days, DIGIT_WORDS};
use crate::registry::Registry;

/// Registers bravo's solvers.
pub fn register(registry: &mut Registry) -> anyhow::Result<()> {
    register_days(
        registry,
        "bravo",
        &[(0, day0_part1, day0_part2), (1, day1_part1, day1_part2)],
    )
}

/// Three largest group sums, largest first.
fn top_three(input: &str) -> anyhow::Result<[u64; 3]> {
    let mut top = [0u64; 3];
    let mut current = 0u64;
    let mut groups = 0usize;
    let mut in_group = false;

    let mut push = |sum: u64, top: &mut [u64; 3]| {
        groups += 1;
        if sum > top[2] {
            top[2] = sum;
            top.sort_unstable_by(|a, b| b.cmp(a));
        }
    };

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            if in_group {
                push(current, &mut top);
            }
            current = 0;
            in_group = false;
            continue;
        }
        let Ok(value) = line.parse::<u64>() else {
            bail!("not a number: '{line}'");
        };
        current += value;
        in_group = true;
    }
    if in_group {
        push(current, &mut top);
    }

    if groups == 0 {
        bail!("empty input");
    }
    Ok(top)
}

fn day0_part1(input: &str) -> anyhow::Result<String> {
    Ok(top_three(input)?[0].to_string())
}

fn day0_part2(input: &str) -> anyhow::Result<String> {
    Ok(top_three(input)?.iter().sum::<u64>().to_string())
}

fn digit_at(bytes: &[u8], i: usize, words: bool) -> Option<u32> {
    if bytes[i].is_ascii_digit() {
        return Some(u32::from(bytes[i] - b'0'));
    }
    if words {
        for (n, word) in DIGIT_WORDS.iter().enumerate() {
            if bytes[i..].starts_with(word.as_bytes()) {
                return Some(n as u32 + 1);
            }
        }
    }
    None
}

fn day1(input: &str, words: bool) -> anyhow::Result<String> {
    let mut total = 0u32;
    for line in input.lines() {
        if line.is_empty() {
            continue;
        }
        let bytes = line.as_bytes();
        let first = (0..bytes.len()).find_map(|i| digit_at(bytes, i, words));
        let last = (0..bytes.len()).rev().find_map(|i| digit_at(bytes, i, words));
        match (first, last) {
            (Some(first), Some(last)) => total += first * 10 + last,
            _ => bail!("no digit in '{line}'"),
        }
    }
    Ok(total.to_string())
}

fn day1_part1(input: &str) -> anyhow::Result<String> {
    day1(input, false)
}

fn day1_part2(input: &str) -> anyhow::Result<String> {
    day1(input, true)
}
