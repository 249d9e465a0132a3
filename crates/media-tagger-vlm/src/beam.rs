//! Deterministic beam search over a next-token log-probability callback.
//!
//! The search follows the usual transformer `generate` semantics: the processors
//! (repetition penalty, n-gram blocking) are applied to the log-probabilities,
//! finished hypotheses are scored by `sum_logprob / len^length_penalty` and the
//! search stops once no live beam can beat the worst kept hypothesis.

use std::collections::HashSet;

/// Parameters controlling beam search decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSearchConfig {
    /// Number of beams kept at each step.
    pub num_beams: usize,
    /// Maximum sequence length, including the start token.
    pub max_length: usize,
    /// Penalty applied to tokens already present in the sequence; `1.0` disables it.
    pub repetition_penalty: f32,
    /// Size of n-grams that may not appear twice; `0` disables it.
    pub no_repeat_ngram_size: usize,
    /// Exponent of the length normalization of finished hypotheses.
    pub length_penalty: f32,
}

impl Default for BeamSearchConfig {
    fn default() -> Self {
        Self {
            num_beams: 5,
            max_length: 50,
            repetition_penalty: 1.2,
            no_repeat_ngram_size: 2,
            length_penalty: 1.0,
        }
    }
}

struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

/// Bounded set of finished hypotheses, best `capacity` kept.
struct Hypotheses {
    capacity: usize,
    length_penalty: f32,
    items: Vec<Hypothesis>,
}

impl Hypotheses {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self {
            capacity,
            length_penalty,
            items: Vec::with_capacity(capacity + 1),
        }
    }

    fn normalize(&self, sum_logprobs: f32, len: usize) -> f32 {
        sum_logprobs / (len.max(1) as f32).powf(self.length_penalty)
    }

    fn worst_score(&self) -> f32 {
        self.items
            .iter()
            .map(|h| h.score)
            .fold(f32::INFINITY, f32::min)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f32) {
        let score = self.normalize(sum_logprobs, tokens.len());
        if self.items.len() < self.capacity || score > self.worst_score() {
            self.items.push(Hypothesis { tokens, score });
            if self.items.len() > self.capacity {
                if let Some(worst) = self
                    .items
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.score.total_cmp(&b.1.score))
                    .map(|(idx, _)| idx)
                {
                    self.items.remove(worst);
                }
            }
        }
    }

    fn is_done(&self, best_sum_logprobs: f32, cur_len: usize) -> bool {
        if self.items.len() < self.capacity {
            return false;
        }
        self.worst_score() >= self.normalize(best_sum_logprobs, cur_len)
    }

    fn into_best(self) -> Option<Hypothesis> {
        self.items
            .into_iter()
            .reduce(|best, h| if h.score > best.score { h } else { best })
    }
}

/// Run beam search starting from `bos` until `eos` or the length cap.
///
/// `next_log_probs` receives the full token sequence of a beam (starting with
/// `bos`) and returns the log-probabilities of the next token over the vocabulary.
///
/// Returns the best sequence without the start and end tokens, or `None` when
/// no hypothesis could be formed (e.g. every token was banned).
pub fn beam_search<F, E>(
    config: &BeamSearchConfig,
    bos: u32,
    eos: u32,
    mut next_log_probs: F,
) -> Result<Option<Vec<u32>>, E>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, E>,
{
    let num_beams = config.num_beams.max(1);
    let mut finished = Hypotheses::new(num_beams, config.length_penalty);
    let mut beams: Vec<(Vec<u32>, f32)> = vec![(vec![bos], 0.0)];
    let mut done = false;

    while let Some(cur_len) = beams.first().map(|(tokens, _)| tokens.len()) {
        if cur_len >= config.max_length {
            break;
        }

        let mut candidates: Vec<(usize, u32, f32)> = Vec::new();
        for (beam_idx, (tokens, beam_score)) in beams.iter().enumerate() {
            let mut scores = next_log_probs(tokens)?;
            apply_repetition_penalty(&mut scores, tokens, config.repetition_penalty);
            ban_repeated_ngrams(&mut scores, tokens, config.no_repeat_ngram_size);
            for (token, score) in top_k(&scores, 2 * num_beams) {
                candidates.push((beam_idx, token as u32, beam_score + score));
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        let best_sum_logprobs = match candidates.first() {
            Some(&(_, _, score)) => score,
            None => break,
        };

        let mut next_beams = Vec::with_capacity(num_beams);
        for (rank, (beam_idx, token, score)) in candidates.into_iter().enumerate() {
            if token == eos {
                // an end token ranked below the beam width does not finish a hypothesis
                if rank < num_beams {
                    finished.add(beams[beam_idx].0.clone(), score);
                }
            } else {
                let mut tokens = beams[beam_idx].0.clone();
                tokens.push(token);
                next_beams.push((tokens, score));
            }
            if next_beams.len() == num_beams {
                break;
            }
        }
        beams = next_beams;

        if finished.is_done(best_sum_logprobs, cur_len) {
            done = true;
            break;
        }
    }

    if !done {
        for (tokens, score) in beams {
            finished.add(tokens, score);
        }
    }

    Ok(finished
        .into_best()
        .map(|h| h.tokens.into_iter().skip(1).collect()))
}

/// Penalize every token already in `tokens`: positive scores are divided by the
/// penalty and negative scores multiplied by it.
pub fn apply_repetition_penalty(scores: &mut [f32], tokens: &[u32], penalty: f32) {
    if penalty == 1.0 {
        return;
    }
    let seen: HashSet<u32> = tokens.iter().copied().collect();
    for token in seen {
        if let Some(score) = scores.get_mut(token as usize) {
            if *score < 0.0 {
                *score *= penalty;
            } else {
                *score /= penalty;
            }
        }
    }
}

/// Forbid tokens that would repeat an n-gram of size `ngram_size` already in `tokens`.
pub fn ban_repeated_ngrams(scores: &mut [f32], tokens: &[u32], ngram_size: usize) {
    if ngram_size == 0 || tokens.len() + 1 < ngram_size {
        return;
    }
    let prefix = &tokens[tokens.len() + 1 - ngram_size..];
    for window in tokens.windows(ngram_size) {
        if &window[..ngram_size - 1] == prefix {
            if let Some(score) = scores.get_mut(window[ngram_size - 1] as usize) {
                *score = f32::NEG_INFINITY;
            }
        }
    }
}

/// The `k` highest finite scores with their indices, best first, ties by lowest index.
fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut best: Vec<(usize, f32)> = Vec::with_capacity(k + 1);
    if k == 0 {
        return best;
    }
    for (idx, &score) in scores.iter().enumerate() {
        if !score.is_finite() {
            continue;
        }
        if best.len() == k && best[k - 1].1 >= score {
            continue;
        }
        let pos = best.partition_point(|&(_, s)| s >= score);
        best.insert(pos, (idx, score));
        best.truncate(k);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOS: u32 = 0;
    const EOS: u32 = 3;
    const NEG: f32 = f32::NEG_INFINITY;

    fn plain(num_beams: usize) -> BeamSearchConfig {
        BeamSearchConfig {
            num_beams,
            max_length: 10,
            repetition_penalty: 1.0,
            no_repeat_ngram_size: 0,
            length_penalty: 0.0,
        }
    }

    // greedy takes 1 (0.6) then 2 (0.55) for a total of 0.33, while ending
    // right after 2 scores 0.4 * 0.95 = 0.38
    fn toy_model(tokens: &[u32]) -> Result<Vec<f32>, String> {
        let ln = |p: f32| p.ln();
        Ok(match tokens {
            [0] => vec![NEG, ln(0.6), ln(0.4), NEG],
            [0, 1] => vec![NEG, NEG, ln(0.55), ln(0.45)],
            [0, 2] => vec![NEG, ln(0.05), NEG, ln(0.95)],
            _ => vec![NEG, NEG, NEG, 0.0],
        })
    }

    #[test]
    fn single_beam_is_greedy() -> Result<(), String> {
        let tokens = beam_search(&plain(1), BOS, EOS, toy_model)?;
        assert_eq!(tokens, Some(vec![1, 2]));
        Ok(())
    }

    #[test]
    fn wider_beam_finds_better_sequence() -> Result<(), String> {
        let tokens = beam_search(&plain(2), BOS, EOS, toy_model)?;
        assert_eq!(tokens, Some(vec![2]));
        Ok(())
    }

    #[test]
    fn stops_at_max_length() -> Result<(), String> {
        let config = BeamSearchConfig {
            max_length: 5,
            ..plain(3)
        };
        let mut calls = 0;
        let tokens = beam_search(&config, BOS, 2, |_| {
            calls += 1;
            Ok::<_, String>(vec![NEG, 0.9f32.ln(), 0.1f32.ln()])
        })?;
        assert_eq!(tokens, Some(vec![1, 1, 1, 1]));
        assert_eq!(calls, 4);
        Ok(())
    }

    #[test]
    fn callback_error_propagates() {
        let res = beam_search(&plain(2), BOS, EOS, |_| Err::<Vec<f32>, _>("boom"));
        assert_eq!(res, Err("boom"));
    }

    #[test]
    fn everything_banned_yields_nothing() -> Result<(), String> {
        let tokens = beam_search(&plain(2), BOS, EOS, |_| Ok::<_, String>(vec![NEG; 4]))?;
        // the start token alone is a hypothesis of zero generated tokens
        assert_eq!(tokens, Some(vec![]));
        Ok(())
    }

    #[test]
    fn repetition_penalty_scales_seen_tokens() {
        let mut scores = vec![-1.0, 2.0, -0.5];
        apply_repetition_penalty(&mut scores, &[0, 1, 1], 2.0);
        assert_eq!(scores, vec![-2.0, 1.0, -0.5]);
    }

    #[test]
    fn repeated_bigram_is_banned() {
        let mut scores = vec![0.0; 8];
        ban_repeated_ngrams(&mut scores, &[0, 5, 6, 5], 2);
        assert_eq!(scores[6], NEG);
        assert_eq!(scores.iter().filter(|s| s.is_finite()).count(), 7);
    }

    #[test]
    fn short_sequence_bans_nothing() {
        let mut scores = vec![0.0; 4];
        ban_repeated_ngrams(&mut scores, &[1], 3);
        assert!(scores.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn top_k_orders_and_skips_infinite() {
        let scores = [0.1, NEG, 0.5, 0.5, -0.2];
        assert_eq!(top_k(&scores, 3), vec![(2, 0.5), (3, 0.5), (0, 0.1)]);
        assert!(top_k(&scores, 0).is_empty());
    }
}
