//! Annotated text runs
//!
//! A block's visible text is an ordered list of [`RichTextRun`]s. Concatenating
//! the `content` of every run reconstructs the plain text of the block.

use serde::{Deserialize, Serialize};

/// Colors accepted by the target format for text and callouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Gray,
    Brown,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
    Red,
    GrayBackground,
    BrownBackground,
    OrangeBackground,
    YellowBackground,
    GreenBackground,
    BlueBackground,
    PurpleBackground,
    PinkBackground,
    RedBackground,
}

impl Color {
    /// Wire name of the color (`blue_background`, `default`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Gray => "gray",
            Color::Brown => "brown",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Pink => "pink",
            Color::Red => "red",
            Color::GrayBackground => "gray_background",
            Color::BrownBackground => "brown_background",
            Color::OrangeBackground => "orange_background",
            Color::YellowBackground => "yellow_background",
            Color::GreenBackground => "green_background",
            Color::BlueBackground => "blue_background",
            Color::PurpleBackground => "purple_background",
            Color::PinkBackground => "pink_background",
            Color::RedBackground => "red_background",
        }
    }
}

/// Inline formatting flags carried by every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Annotations::default()
    }
}

/// One contiguous span of identically-annotated text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RichTextRun {
    pub content: String,
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RichTextRun {
    /// Unannotated run.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: None,
        }
    }

    pub fn annotated(content: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            content: content.into(),
            annotations,
            link: None,
        }
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    pub fn bold(mut self) -> Self {
        self.annotations.bold = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.annotations.code = true;
        self
    }

    /// Target-format JSON for this run.
    pub fn to_notion_value(&self) -> serde_json::Value {
        let link = self
            .link
            .as_ref()
            .map(|url| serde_json::json!({ "url": url }));
        serde_json::json!({
            "type": "text",
            "text": {
                "content": self.content,
                "link": link,
            },
            "annotations": {
                "bold": self.annotations.bold,
                "italic": self.annotations.italic,
                "strikethrough": self.annotations.strikethrough,
                "underline": self.annotations.underline,
                "code": self.annotations.code,
                "color": self.annotations.color.as_str(),
            },
        })
    }
}

/// Plain text of a run list.
pub fn plain_text(runs: &[RichTextRun]) -> String {
    runs.iter().map(|run| run.content.as_str()).collect()
}

/// Split runs longer than `max_chars` into consecutive runs with the same
/// annotations and link. Splits on character boundaries.
pub fn split_long_runs(runs: Vec<RichTextRun>, max_chars: usize) -> Vec<RichTextRun> {
    if max_chars == 0 || runs.iter().all(|run| run.content.chars().count() <= max_chars) {
        return runs;
    }

    let mut out = Vec::with_capacity(runs.len() + 1);
    for run in runs {
        if run.content.chars().count() <= max_chars {
            out.push(run);
            continue;
        }
        let chars: Vec<char> = run.content.chars().collect();
        for piece in chars.chunks(max_chars) {
            out.push(RichTextRun {
                content: piece.iter().collect(),
                annotations: run.annotations,
                link: run.link.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_concatenates_runs() {
        let runs = vec![
            RichTextRun::plain("Click "),
            RichTextRun::plain("Save").bold(),
            RichTextRun::plain("."),
        ];
        assert_eq!(plain_text(&runs), "Click Save.");
    }

    #[test]
    fn long_runs_split_keep_annotations() {
        let run = RichTextRun::plain("abcdefghij").code().with_link("https://x.test");
        let split = split_long_runs(vec![run], 4);
        assert_eq!(split.len(), 3);
        assert_eq!(split[2].content, "ij");
        assert!(split.iter().all(|r| r.annotations.code));
        assert!(split.iter().all(|r| r.link.as_deref() == Some("https://x.test")));
    }

    #[test]
    fn split_respects_multibyte_chars() {
        let split = split_long_runs(vec![RichTextRun::plain("ééé")], 2);
        assert_eq!(split[0].content, "éé");
        assert_eq!(split[1].content, "é");
    }

    #[test]
    fn run_json_shape() {
        let value = RichTextRun::plain("docs").with_link("https://docs.test").to_notion_value();
        assert_eq!(value["text"]["content"], "docs");
        assert_eq!(value["text"]["link"]["url"], "https://docs.test");
        assert_eq!(value["annotations"]["color"], "default");
    }
}
