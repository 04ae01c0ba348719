use std::collections::VecDeque;

/// Separators tried in order; `""` falls back to single characters.
const SEPARATORS: [&str; 5] = [". ", "\n\n", "\n", " ", ""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PageDocument {
    pub(super) source: String,
    pub(super) page: usize,
    pub(super) text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TextChunk {
    pub(super) chunk_id: String,
    pub(super) source: String,
    pub(super) page: usize,
    pub(super) seq: usize,
    pub(super) text: String,
}

/// Splits text on the coarsest separator present, recursing into pieces that are still too
/// long, then greedily merges pieces back into chunks of at most `chunk_size` characters
/// with up to `chunk_overlap` characters carried over between neighbours.
#[derive(Debug, Clone)]
pub(super) struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    pub(super) fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub(super) fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut pending = Vec::<String>::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut merged = Vec::new();
        let mut current = VecDeque::<&str>::new();
        let mut total = 0usize;

        for piece in pieces {
            let length = char_len(piece);
            if total + length > self.chunk_size && !current.is_empty() {
                push_joined(&mut merged, &current);
                while total > self.chunk_overlap || (total + length > self.chunk_size && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first);
                }
            }

            current.push_back(piece);
            total += length;
        }

        push_joined(&mut merged, &current);
        merged
    }
}

fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (index, separator) in separators.iter().copied().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[index + 1..]);
        }
    }

    (separators.last().copied().unwrap_or(""), &[])
}

fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    text.split_inclusive(separator)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_joined(merged: &mut Vec<String>, current: &VecDeque<&str>) {
    let joined = current.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        merged.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cuts a chunk back to its last full stop so snippets end on a sentence boundary.
pub(super) fn trim_to_last_period(text: &str) -> &str {
    match text.rfind('.') {
        Some(index) => &text[..=index],
        None => text,
    }
}

/// Splits every page and numbers the chunks `source:page:n`, restarting `n` per page.
pub(super) fn chunk_documents(documents: &[PageDocument], splitter: &RecursiveSplitter) -> Vec<TextChunk> {
    let mut chunks = Vec::<TextChunk>::new();
    let mut last_key: Option<String> = None;
    let mut seq = 0usize;

    for document in documents {
        for piece in splitter.split(&document.text) {
            let key = format!("{}:{}", document.source, document.page);
            seq = if last_key.as_deref() == Some(key.as_str()) {
                seq + 1
            } else {
                0
            };

            chunks.push(TextChunk {
                chunk_id: format!("{key}:{seq}"),
                source: document.source.clone(),
                page: document.page,
                seq,
                text: trim_to_last_period(&piece).to_string(),
            });
            last_key = Some(key);
        }
    }

    chunks
}
