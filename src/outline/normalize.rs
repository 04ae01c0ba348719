use super::OutlineParser;

const PUNCTUATION_SUBSTITUTIONS: [(char, &str); 7] = [
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2026}', "..."),
];

pub fn normalize_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match PUNCTUATION_SUBSTITUTIONS
            .iter()
            .find(|(unicode, _)| *unicode == character)
        {
            Some((_, ascii)) => out.push_str(ascii),
            None => out.push(character),
        }
    }
    out
}

impl OutlineParser {
    /// Strips Markdown decoration and extraction noise from heading text.
    ///
    /// The cleaning pass is repeated until it stops changing the text, so the result is a
    /// fixed point: cleaning it again returns it unchanged. An empty result means the input
    /// was pure noise.
    pub fn clean_heading_text(&self, text: &str) -> String {
        let mut current = self.clean_once(text);
        loop {
            let next = self.clean_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_once(&self, text: &str) -> String {
        let text = normalize_punctuation(text);
        let text = self.inline_code.replace_all(&text, "$1").replace('`', "");
        let text = self.bold_span.replace_all(&text, "$1");
        let text = self.trailing_page_number.replace(&text, "");
        let text = self.punctuation_run.replace_all(&text, "");

        text.split_whitespace().collect::<Vec<&str>>().join(" ")
    }
}
