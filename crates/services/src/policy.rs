//! Board-level validation of post payloads.

use domains::{Board, BoardCapabilities, BoardPolicy, DomainError, DomainResult, NewPost, PostPatch};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Thread,
    Reply,
}

impl PostKind {
    fn label(self) -> &'static str {
        match self {
            PostKind::Thread => "thread",
            PostKind::Reply => "reply",
        }
    }
}

/// A board's limits with its MIME globs compiled.
#[derive(Debug, Clone)]
pub struct PostPolicy {
    policy: BoardPolicy,
    capabilities: BoardCapabilities,
    file_types: Vec<Regex>,
}

/// `image/*` → `^image/.*$`, case-insensitive.
fn compile_glob(glob: &str) -> Option<Regex> {
    let pattern = regex::escape(glob.trim()).replace(r"\*", ".*");
    match Regex::new(&format!("(?i)^{pattern}$")) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(glob, error = %e, "ignoring unusable file type pattern");
            None
        }
    }
}

fn check_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(DomainError::validation(format!(
            "{field} is too long ({len} characters, at most {max})"
        )));
    }
    Ok(())
}

impl PostPolicy {
    pub fn new(board: &Board) -> Self {
        let file_types = board
            .policy
            .supported_file_types
            .iter()
            .flat_map(|s| s.split(','))
            .filter(|s| !s.trim().is_empty())
            .filter_map(compile_glob)
            .collect();
        Self {
            policy: board.policy.clone(),
            capabilities: board.capabilities.clone(),
            file_types,
        }
    }

    pub fn policy(&self) -> &BoardPolicy {
        &self.policy
    }

    /// The MIME type must parse and match one allowlisted glob.
    pub fn accepts_mime(&self, mime_type: &str) -> bool {
        let Ok(parsed) = mime_type.trim().parse::<mime::Mime>() else {
            return false;
        };
        let essence = parsed.essence_str();
        self.file_types.iter().any(|re| re.is_match(essence))
    }

    /// Returns the first violation found.
    pub fn validate_post(&self, payload: &NewPost, kind: PostKind) -> DomainResult<()> {
        if !self.policy.posting_enabled {
            return Err(DomainError::validation("posting is disabled on this board"));
        }
        if payload.draft && !self.capabilities.drafts_enabled {
            return Err(DomainError::validation("drafts are not enabled on this board"));
        }
        self.check_fields(
            Some(&payload.name),
            Some(&payload.email),
            Some(&payload.subject),
            Some(&payload.text),
            Some(&payload.password),
        )?;
        if payload.text.trim().is_empty() && payload.files.is_empty() {
            return Err(DomainError::validation(format!(
                "a {} needs text or a file",
                kind.label()
            )));
        }

        let count = payload.files.len();
        if count > self.policy.max_file_count as usize {
            return Err(DomainError::validation(format!(
                "too many files ({count}, at most {})",
                self.policy.max_file_count
            )));
        }
        for file in &payload.files {
            if file.size() > self.policy.max_file_size {
                return Err(DomainError::validation(format!(
                    "{} is too large ({} bytes, at most {})",
                    file.file_name,
                    file.size(),
                    self.policy.max_file_size
                )));
            }
            if !self.accepts_mime(&file.mime_type) {
                return Err(DomainError::validation(format!(
                    "file type {} is not supported",
                    file.mime_type
                )));
            }
        }
        Ok(())
    }

    /// Re-checks only the fields an edit touches.
    pub fn validate_patch(&self, patch: &PostPatch) -> DomainResult<()> {
        if patch.draft == Some(true) && !self.capabilities.drafts_enabled {
            return Err(DomainError::validation("drafts are not enabled on this board"));
        }
        self.check_fields(
            patch.name.as_deref(),
            patch.email.as_deref(),
            patch.subject.as_deref(),
            patch.text.as_deref(),
            None,
        )
    }

    fn check_fields(
        &self,
        name: Option<&str>,
        email: Option<&str>,
        subject: Option<&str>,
        text: Option<&str>,
        password: Option<&str>,
    ) -> DomainResult<()> {
        let p = &self.policy;
        let checks = [
            ("e-mail", email, p.max_email_length),
            ("name", name, p.max_name_length),
            ("subject", subject, p.max_subject_length),
            ("text", text, p.max_text_length),
            ("password", password, p.max_password_length),
        ];
        for (field, value, max) in checks {
            if let Some(value) = value {
                check_len(field, value, max)?;
            }
        }
        Ok(())
    }
}

pub fn validate_post(board: &Board, payload: &NewPost, kind: PostKind) -> DomainResult<()> {
    PostPolicy::new(board).validate_post(payload, kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use domains::{Rating, UploadedFile};

    fn board() -> Board {
        let mut board = Board::new("b", "Random");
        board.policy.max_file_count = 2;
        board.policy.max_file_size = 1024;
        board.policy.supported_file_types = vec!["image/*".into(), "video/webm".into()];
        board
    }

    fn file(mime: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: "f".into(),
            mime_type: mime.into(),
            data: Bytes::from(vec![0u8; size]),
            rating: Rating::Safe,
        }
    }

    fn text(s: &str) -> NewPost {
        NewPost { text: s.into(), ..NewPost::default() }
    }

    fn reason(result: DomainResult<()>) -> String {
        match result {
            Err(DomainError::Validation(reason)) => reason,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_plain_reply() {
        assert!(validate_post(&board(), &text("hello"), PostKind::Reply).is_ok());
    }

    #[test]
    fn rejects_long_fields() {
        let payload = NewPost { name: "n".repeat(51), ..text("hi") };
        assert!(reason(validate_post(&board(), &payload, PostKind::Reply)).starts_with("name"));

        let payload = text(&"ж".repeat(15_000));
        assert!(validate_post(&board(), &payload, PostKind::Reply).is_ok());
        let payload = text(&"ж".repeat(15_001));
        assert!(reason(validate_post(&board(), &payload, PostKind::Reply)).starts_with("text"));
    }

    #[test]
    fn rejects_empty_post() {
        let err = reason(validate_post(&board(), &NewPost::default(), PostKind::Thread));
        assert_eq!(err, "a thread needs text or a file");

        let payload = NewPost { files: vec![file("image/png", 10)], ..NewPost::default() };
        assert!(validate_post(&board(), &payload, PostKind::Thread).is_ok());
    }

    #[test]
    fn file_limits() {
        let policy = PostPolicy::new(&board());
        let too_many = NewPost {
            files: vec![file("image/png", 1), file("image/png", 1), file("image/png", 1)],
            ..text("x")
        };
        assert!(reason(policy.validate_post(&too_many, PostKind::Reply)).starts_with("too many"));

        let too_big = NewPost { files: vec![file("image/png", 1025)], ..text("x") };
        assert!(reason(policy.validate_post(&too_big, PostKind::Reply)).contains("too large"));

        let wrong_type = NewPost { files: vec![file("application/pdf", 1)], ..text("x") };
        assert!(reason(policy.validate_post(&wrong_type, PostKind::Reply)).contains("not supported"));
    }

    #[test]
    fn mime_globs_are_case_insensitive() {
        let policy = PostPolicy::new(&board());
        assert!(policy.accepts_mime("image/png"));
        assert!(policy.accepts_mime("IMAGE/JPEG"));
        assert!(policy.accepts_mime("video/webm; codecs=vp9"));
        assert!(!policy.accepts_mime("video/mp4"));
        assert!(!policy.accepts_mime("not a mime"));
    }

    #[test]
    fn closed_board_and_drafts() {
        let mut closed = board();
        closed.policy.posting_enabled = false;
        assert!(validate_post(&closed, &text("x"), PostKind::Reply).is_err());

        let mut no_drafts = board();
        no_drafts.capabilities.drafts_enabled = false;
        let draft = NewPost { draft: true, ..text("x") };
        assert!(validate_post(&no_drafts, &draft, PostKind::Reply).is_err());
        assert!(validate_post(&board(), &draft, PostKind::Reply).is_ok());
    }

    #[test]
    fn patch_checks_only_edited_fields() {
        let policy = PostPolicy::new(&board());
        assert!(policy.validate_patch(&PostPatch::default()).is_ok());
        let patch = PostPatch { subject: Some("s".repeat(151)), ..PostPatch::default() };
        assert!(reason(policy.validate_patch(&patch)).starts_with("subject"));
        let patch = PostPatch { text: Some(String::new()), ..PostPatch::default() };
        assert!(policy.validate_patch(&patch).is_ok());
    }
}
