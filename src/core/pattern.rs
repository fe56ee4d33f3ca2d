//! Digit pattern analysis
//!
//! Stateless helpers shared by the rule engine and the spam module.

use std::collections::BTreeMap;

use crate::utils::constants::VIRTUAL_NUMBER_PATTERNS_3;

pub struct PatternAnalyzer;

impl PatternAnalyzer {
    /// Shannon entropy (bits per symbol) of the character distribution of `s`.
    ///
    /// Returns 0.0 for the empty string and for single-symbol strings.
    pub fn entropy(s: &str) -> f64 {
        let total = s.chars().count();
        if total == 0 {
            return 0.0;
        }

        let mut counts: BTreeMap<char, usize> = BTreeMap::new();
        for c in s.chars() {
            *counts.entry(c).or_insert(0) += 1;
        }

        counts
            .values()
            .map(|&n| {
                let p = n as f64 / total as f64;
                -p * p.log2()
            })
            .sum::<f64>()
            .max(0.0)
    }

    /// Run all digit checks and concatenate their findings.
    ///
    /// Checks are independent: repeated digits, sequential runs and virtual
    /// number runs may all be reported for the same input.
    pub fn patterns(digits: &str) -> Vec<String> {
        let mut findings = Vec::new();

        let repeated = Self::repeated_digits(digits);
        if !repeated.is_empty() {
            let list: Vec<String> = repeated.iter().map(|c| c.to_string()).collect();
            findings.push(format!("Repeated digits: {}", list.join(", ")));
        }

        let sequences = Self::find_sequences(digits);
        if !sequences.is_empty() {
            findings.push(format!("Sequences found: {}", sequences.join(", ")));
        }

        if Self::has_virtual_pattern(digits) {
            findings.push("Contains virtual number patterns".to_string());
        }

        findings
    }

    /// Digits occurring in more than half of the positions
    pub fn repeated_digits(digits: &str) -> Vec<char> {
        let len = digits.chars().count();
        let mut counts: BTreeMap<char, usize> = BTreeMap::new();
        for c in digits.chars() {
            *counts.entry(c).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter(|&(_, n)| n * 2 > len)
            .map(|(c, _)| c)
            .collect()
    }

    /// Every window of three consecutive ascending or descending digits
    pub fn find_sequences(digits: &str) -> Vec<String> {
        let values: Vec<i32> = digits
            .chars()
            .filter_map(|c| c.to_digit(10).map(|d| d as i32))
            .collect();

        values
            .windows(3)
            .filter(|w| {
                let ascending = w[0] + 1 == w[1] && w[1] + 1 == w[2];
                let descending = w[0] - 1 == w[1] && w[1] - 1 == w[2];
                ascending || descending
            })
            .map(|w| format!("{}{}{}", w[0], w[1], w[2]))
            .collect()
    }

    pub fn has_virtual_pattern(digits: &str) -> bool {
        VIRTUAL_NUMBER_PATTERNS_3.iter().any(|p| digits.contains(p))
    }
}
