//! Message segments and bodies.
//!
//! A [`MessageBody`] is an ordered list of [`Segment`]s, the unit protocol
//! adapters produce when they normalize an incoming message. Rules and
//! handlers inspect and (rarely) rewrite bodies in place, so the helpers here
//! cover exactly the shapes the rule system needs: plain-text extraction,
//! the single-text-segment check, and mention lookup/removal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single unit of message content.
///
/// Serialized in the tagged `{"type": ..., "data": ...}` layout so bodies can
/// be logged or handed to adapters without a second representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text content.
    Text {
        /// The text itself.
        text: String,
    },
    /// An @-mention addressed to a user.
    Mention {
        /// User id of the mention target.
        target: u64,
        /// Display form, e.g. `@nickname`.
        display: String,
    },
    /// A platform emoji/face by id.
    Face {
        /// Platform-specific face id.
        id: u32,
    },
    /// An image, referenced by file id or URL.
    Image {
        /// File identifier or URL.
        file: String,
    },
    /// A reply reference to an earlier message.
    Reply {
        /// Id of the message being replied to.
        message_id: u64,
    },
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// Creates a mention segment.
    pub fn mention(target: u64, display: impl Into<String>) -> Self {
        Segment::Mention {
            target,
            display: display.into(),
        }
    }

    /// Returns true if this is a plain text segment.
    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text { .. })
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text { text } => write!(f, "{text}"),
            Segment::Mention { display, .. } => write!(f, "{display}"),
            Segment::Face { id } => write!(f, "[face:{id}]"),
            Segment::Image { file } => write!(f, "[image:{file}]"),
            Segment::Reply { message_id } => write!(f, "[reply:{message_id}]"),
        }
    }
}

/// An ordered sequence of message segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBody(Vec<Segment>);

impl MessageBody {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a segment.
    pub fn push(&mut self, segment: Segment) -> &mut Self {
        self.0.push(segment);
        self
    }

    /// Appends a plain text segment.
    pub fn push_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Segment::text(text))
    }

    /// Appends a mention segment.
    pub fn push_mention(&mut self, target: u64, display: impl Into<String>) -> &mut Self {
        self.push(Segment::mention(target, display))
    }

    /// Returns an iterator over the segments.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }

    /// Returns the number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the body has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenates the content of all text segments, skipping everything else.
    pub fn plain_text(&self) -> String {
        self.0
            .iter()
            .filter_map(Segment::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Returns the text content iff the body is exactly one text segment.
    ///
    /// The single-segment rules (prefix/suffix/full match) are defined over
    /// this shape only; mixed or multi-segment bodies never match them.
    pub fn single_text(&self) -> Option<&str> {
        match self.0.as_slice() {
            [Segment::Text { text }] => Some(text),
            _ => None,
        }
    }

    /// Returns true if any mention segment addresses `target`.
    pub fn mentions(&self, target: u64) -> bool {
        self.0
            .iter()
            .any(|seg| matches!(seg, Segment::Mention { target: t, .. } if *t == target))
    }

    /// Removes the first mention of `target` in place.
    ///
    /// If the segment following the mention is text starting with a space,
    /// one leading space is removed with it, so `[@bot, " hello"]` becomes
    /// `["hello"]`. Returns true if a mention was removed.
    pub fn remove_mention(&mut self, target: u64) -> bool {
        let Some(pos) = self
            .0
            .iter()
            .position(|seg| matches!(seg, Segment::Mention { target: t, .. } if *t == target))
        else {
            return false;
        };

        if let Some(Segment::Text { text }) = self.0.get_mut(pos + 1)
            && text.starts_with(' ')
        {
            text.remove(0);
        }
        self.0.remove(pos);
        true
    }
}

impl fmt::Display for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        let mut body = Self::new();
        body.push_text(text);
        body
    }
}

impl From<Vec<Segment>> for MessageBody {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<Segment> for MessageBody {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_skips_non_text_segments() {
        let body: MessageBody = vec![
            Segment::text("hello "),
            Segment::mention(42, "@someone"),
            Segment::text("world"),
        ]
        .into();
        assert_eq!(body.plain_text(), "hello world");
    }

    #[test]
    fn single_text_requires_exactly_one_text_segment() {
        assert_eq!(MessageBody::from("ping").single_text(), Some("ping"));
        assert_eq!(MessageBody::new().single_text(), None);

        let mixed: MessageBody = vec![Segment::text("a"), Segment::text("b")].into();
        assert_eq!(mixed.single_text(), None);

        let non_text: MessageBody = vec![Segment::mention(1, "@x")].into();
        assert_eq!(non_text.single_text(), None);
    }

    #[test]
    fn remove_mention_strips_one_leading_space() {
        let mut body: MessageBody =
            vec![Segment::mention(7, "@bot"), Segment::text(" hello")].into();
        assert!(body.remove_mention(7));
        assert_eq!(body.single_text(), Some("hello"));

        // The following segment keeps further spaces.
        let mut body: MessageBody =
            vec![Segment::mention(7, "@bot"), Segment::text("  hi")].into();
        assert!(body.remove_mention(7));
        assert_eq!(body.single_text(), Some(" hi"));
    }

    #[test]
    fn remove_mention_ignores_other_targets() {
        let mut body: MessageBody =
            vec![Segment::mention(7, "@bot"), Segment::text(" hello")].into();
        assert!(!body.remove_mention(99));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn segment_roundtrips_through_json() {
        let body: MessageBody = vec![Segment::text("hi"), Segment::mention(3, "@a")].into();
        let json = serde_json::to_string(&body).unwrap();
        let back: MessageBody = serde_json::from_str(&json).unwrap();
        assert_eq!(body, back);
    }
}
