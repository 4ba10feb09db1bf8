//! Scores for the training loop: flat accuracy over every position, entity-level F1 over
//! IOB-style tag sequences, and F1 of a single positive class.

use std::collections::BTreeSet;

/// The fraction of positions where the prediction matches the label, padding included
pub fn flat_accuracy(preds: &[i64], labels: &[i64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }

    let matches = preds
        .iter()
        .zip(labels)
        .filter(|(pred, label)| pred == label)
        .count();

    matches as f64 / labels.len() as f64
}

/// Entity-level F1 between two parallel tag sequences.
///
/// Chunks are read the way seqeval's default (non-strict) mode reads them: a tag is a one-letter
/// prefix (`B`, `I`, `E`, `S`) and an entity type joined by `_` or `-`, `O` is outside, and a
/// change of type ends a chunk even without a new `B`. Tags that fit neither shape count as
/// outside. Returns 0.0 when either side has no entities.
pub fn f1_score<S: AsRef<str>>(true_tags: &[S], pred_tags: &[S]) -> f64 {
    let true_entities = entities(true_tags);
    let pred_entities = entities(pred_tags);

    let correct = true_entities.intersection(&pred_entities).count() as f64;
    if correct == 0.0 {
        return 0.0;
    }

    let precision = correct / pred_entities.len() as f64;
    let recall = correct / true_entities.len() as f64;

    2.0 * precision * recall / (precision + recall)
}

/// F1 of one class in a flat classification, treating every other label as negative
pub fn binary_f1(preds: &[i64], labels: &[i64], positive: i64) -> f64 {
    let mut true_positives = 0usize;
    let mut false_positives = 0usize;
    let mut false_negatives = 0usize;

    for (pred, label) in preds.iter().zip(labels) {
        match (*pred == positive, *label == positive) {
            (true, true) => true_positives += 1,
            (true, false) => false_positives += 1,
            (false, true) => false_negatives += 1,
            (false, false) => {}
        }
    }

    let denominator = 2 * true_positives + false_positives + false_negatives;
    if denominator == 0 {
        return 0.0;
    }

    2.0 * true_positives as f64 / denominator as f64
}

/// An entity chunk: (type, first position, last position)
type Entity = (String, usize, usize);

fn split_tag(tag: &str) -> (char, &str) {
    let mut chars = tag.chars();

    match (chars.next(), chars.next()) {
        (Some(prefix @ ('B' | 'I' | 'E' | 'S')), Some('_' | '-')) => (prefix, &tag[2..]),
        _ => ('O', ""),
    }
}

fn end_of_chunk(prev_tag: char, tag: char, prev_type: &str, entity_type: &str) -> bool {
    match (prev_tag, tag) {
        ('E' | 'S', _) => true,
        ('B' | 'I', 'B' | 'S' | 'O') => true,
        _ => prev_tag != 'O' && prev_type != entity_type,
    }
}

fn start_of_chunk(prev_tag: char, tag: char, prev_type: &str, entity_type: &str) -> bool {
    match (prev_tag, tag) {
        (_, 'B' | 'S') => true,
        ('E' | 'S' | 'O', 'E' | 'I') => true,
        _ => tag != 'O' && prev_type != entity_type,
    }
}

fn entities<S: AsRef<str>>(tags: &[S]) -> BTreeSet<Entity> {
    let mut found = BTreeSet::new();

    let mut prev_tag = 'O';
    let mut prev_type = "";
    let mut begin = 0;

    // A trailing outside tag closes any chunk still open at the end
    let tags = tags.iter().map(|tag| tag.as_ref()).chain(std::iter::once("O"));

    for (position, tag) in tags.enumerate() {
        let (tag, entity_type) = split_tag(tag);

        if end_of_chunk(prev_tag, tag, prev_type, entity_type) {
            found.insert((prev_type.to_string(), begin, position - 1));
        }

        if start_of_chunk(prev_tag, tag, prev_type, entity_type) {
            begin = position;
        }

        prev_tag = tag;
        prev_type = entity_type;
    }

    found
}
