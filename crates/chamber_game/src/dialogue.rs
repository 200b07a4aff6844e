use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueStep<'a> {
    Show { line: &'a DialogueLine, has_next: bool },
    Closed,
}

/// Walks a dialogue script one line at a time. A script plays at most once.
#[derive(Debug, Clone)]
pub struct DialogueCursor {
    lines: Vec<DialogueLine>,
    position: Option<usize>,
    started: bool,
}

impl DialogueCursor {
    pub fn new(lines: Vec<DialogueLine>) -> Self {
        Self {
            lines,
            position: None,
            started: false,
        }
    }

    /// Returns `None` when the script is empty or was already started.
    pub fn start(&mut self) -> Option<DialogueStep<'_>> {
        if self.started || self.lines.is_empty() {
            return None;
        }
        self.started = true;
        self.position = Some(0);
        Some(self.current())
    }

    /// Move to the next line, or close after the last one. No-op while closed.
    pub fn advance(&mut self) -> Option<DialogueStep<'_>> {
        let index = self.position? + 1;
        if index >= self.lines.len() {
            self.position = None;
            return Some(DialogueStep::Closed);
        }
        self.position = Some(index);
        Some(self.current())
    }

    fn current(&self) -> DialogueStep<'_> {
        match self.position {
            Some(index) => DialogueStep::Show {
                line: &self.lines[index],
                has_next: index + 1 < self.lines.len(),
            },
            None => DialogueStep::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Vec<DialogueLine> {
        vec![
            DialogueLine {
                speaker: "Aldric".to_string(),
                text: "This handwriting... it feels familiar.".to_string(),
            },
            DialogueLine {
                speaker: "Vespera".to_string(),
                text: "Perhaps you are lost.".to_string(),
            },
        ]
    }

    #[test]
    fn walks_lines_then_closes() {
        let mut cursor = DialogueCursor::new(script());
        match cursor.start() {
            Some(DialogueStep::Show { line, has_next }) => {
                assert_eq!(line.speaker, "Aldric");
                assert!(has_next);
            }
            other => panic!("unexpected {other:?}"),
        }
        match cursor.advance() {
            Some(DialogueStep::Show { line, has_next }) => {
                assert_eq!(line.speaker, "Vespera");
                assert!(!has_next);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(cursor.advance(), Some(DialogueStep::Closed));
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn starts_only_once() {
        let mut cursor = DialogueCursor::new(script());
        assert!(cursor.start().is_some());
        assert!(cursor.start().is_none());
    }

    #[test]
    fn closed_script_cannot_restart() {
        let mut cursor = DialogueCursor::new(script());
        assert!(cursor.start().is_some());
        assert!(cursor.advance().is_some());
        assert_eq!(cursor.advance(), Some(DialogueStep::Closed));
        assert!(cursor.start().is_none());
        assert_eq!(cursor.advance(), None);
    }

    #[test]
    fn empty_script_never_opens() {
        let mut cursor = DialogueCursor::new(Vec::new());
        assert!(cursor.start().is_none());
        assert_eq!(cursor.advance(), None);
    }
}
