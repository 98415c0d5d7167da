/// Greedy CTC decode over a flattened `[frames, vocab]` score matrix.
///
/// Repeats collapse first, then blanks drop, so a blank between two equal
/// ids keeps both. The blank id is the last vocabulary entry
/// (`tokens.len()`), after all real tokens.
pub fn greedy_decode(data: &[f32], tokens: &[String]) -> String {
    let vocab_size = tokens.len() + 1;
    let blank = tokens.len();
    let frames = data.len() / vocab_size;

    let mut ids = Vec::new();
    let mut prev = blank;
    for t in 0..frames {
        let row = &data[t * vocab_size..(t + 1) * vocab_size];
        let best = argmax(row);
        if best != prev && best != blank {
            ids.push(best);
        }
        prev = best;
    }

    ids_to_text(&ids, tokens)
}

fn argmax(row: &[f32]) -> usize {
    let mut best = 0;
    let mut best_score = f32::MIN;
    for (i, &v) in row.iter().enumerate() {
        if v > best_score {
            best_score = v;
            best = i;
        }
    }
    best
}

/// Join sentencepiece tokens, turning the `▁` word marker into spaces.
fn ids_to_text(ids: &[usize], tokens: &[String]) -> String {
    let mut text = String::new();
    for &id in ids {
        if let Some(piece) = tokens.get(id) {
            text.push_str(piece);
        }
    }
    text.replace('▁', " ").trim().to_string()
}
