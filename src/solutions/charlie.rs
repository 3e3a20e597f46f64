//! Agent charlie: heap for the warm-up, byte scanning from both ends for day 1.

use std::{cmp::Reverse, collections::BinaryHeap};

use anyhow::{anyhow, Context};

use super::{register_days, DIGIT_WORDS};
use crate::registry::Registry;

/// Registers charlie's solvers.
pub fn register(registry: &mut Registry) -> anyhow::Result<()> {
    register_days(
        registry,
        "charlie",
        &[(0, day0_part1, day0_part2), (1, day1_part1, day1_part2)],
    )
}

/// Sum of the `k` largest groups, kept in a min-heap of size `k`.
fn largest_groups(input: &str, k: usize) -> anyhow::Result<u64> {
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for group in input.split("\n\n").filter(|g| !g.trim().is_empty()) {
        let mut sum = 0u64;
        for line in group.lines().map(str::trim).filter(|l| !l.is_empty()) {
            sum += line
                .parse::<u64>()
                .with_context(|| format!("bad calories '{line}'"))?;
        }
        heap.push(Reverse(sum));
        if heap.len() > k {
            heap.pop();
        }
    }
    if heap.is_empty() {
        return Err(anyhow!("no group in input"));
    }
    Ok(heap.into_iter().map(|Reverse(sum)| sum).sum())
}

fn day0_part1(input: &str) -> anyhow::Result<String> {
    largest_groups(input, 1).map(|n| n.to_string())
}

fn day0_part2(input: &str) -> anyhow::Result<String> {
    largest_groups(input, 3).map(|n| n.to_string())
}

fn scan(line: &[u8], positions: impl Iterator<Item = usize>, words: bool) -> Option<u32> {
    for i in positions {
        let b = line[i];
        if b.is_ascii_digit() {
            return Some(u32::from(b - b'0'));
        }
        if !words {
            continue;
        }
        if let Some(n) = DIGIT_WORDS
            .iter()
            .position(|w| line[i..].starts_with(w.as_bytes()))
        {
            return Some(n as u32 + 1);
        }
    }
    None
}

fn day1(input: &str, words: bool) -> anyhow::Result<String> {
    input
        .lines()
        .filter(|l| !l.is_empty())
        .map(|line| {
            let bytes = line.as_bytes();
            let first = scan(bytes, 0..bytes.len(), words);
            let last = scan(bytes, (0..bytes.len()).rev(), words);
            first
                .zip(last)
                .map(|(a, b)| a * 10 + b)
                .ok_or_else(|| anyhow!("line without digit: '{line}'"))
        })
        .sum::<anyhow::Result<u32>>()
        .map(|n| n.to_string())
}

fn day1_part1(input: &str) -> anyhow::Result<String> {
    day1(input, false)
}

fn day1_part2(input: &str) -> anyhow::Result<String> {
    day1(input, true)
}
