use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("correct option index {index} is out of range")]
    CorrectIndexOutOfRange { index: usize },

    #[error("question category cannot be empty")]
    EmptyCategory,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice trivia item.
///
/// Immutable once built; sessions hold their own copy of the questions they draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: [String; OPTION_COUNT],
    correct_option_index: usize,
    category: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt, an option, or the category is blank,
    /// or if `correct_option_index` does not point at one of the options.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct_option_index: usize,
        category: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into().trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if let Some(index) = options.iter().position(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct_option_index >= OPTION_COUNT {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_option_index,
            });
        }
        let category = category.into().trim().to_owned();
        if category.is_empty() {
            return Err(QuestionError::EmptyCategory);
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_option_index,
            category,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_option_index(&self) -> usize {
        self.correct_option_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_option_index]
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_option_index
    }
}

/// Unvalidated wire shape used when loading question banks from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: u64,
    pub prompt: String,
    pub options: [String; OPTION_COUNT],
    pub correct_option_index: usize,
    pub category: String,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        Question::new(
            QuestionId::new(draft.id),
            draft.prompt,
            draft.options,
            draft.correct_option_index,
            draft.category,
        )
    }
}

impl From<Question> for QuestionDraft {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.value(),
            prompt: question.prompt,
            options: question.options,
            correct_option_index: question.correct_option_index,
            category: question.category,
        }
    }
}
