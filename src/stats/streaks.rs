//! Win streak helpers over win/loss sequences

/// Length of the longest run of wins anywhere in `results`
pub fn longest_run(results: &[bool]) -> usize {
    let mut longest = 0;
    let mut current = 0;

    for &won in results {
        if won {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    longest
}

/// Number of wins before the first loss; `results` is most recent first
pub fn leading_run(results: &[bool]) -> usize {
    results.iter().take_while(|&&won| won).count()
}
