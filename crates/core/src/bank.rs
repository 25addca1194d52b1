//! Question bank: the built-in trivia set plus JSON-loaded banks.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::{Question, QuestionError, QuestionId};

/// Questions drawn for one game unless configured otherwise.
pub const DEFAULT_QUESTIONS_PER_GAME: usize = 15;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is empty")]
    Empty,

    #[error("question id {0} appears more than once")]
    DuplicateId(QuestionId),

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error("invalid question bank JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable pool of questions to draw games from.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// # Errors
    ///
    /// Returns `BankError::Empty` or `BankError::DuplicateId`.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(BankError::DuplicateId(q.id()));
            }
        }
        Ok(Self { questions })
    }

    /// Parse a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Json` for malformed input or invalid questions,
    /// and the errors of [`QuestionBank::new`].
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        Self::new(questions)
    }

    /// The bank that ships with the game.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in table itself is malformed.
    pub fn builtin() -> Result<Self, BankError> {
        let questions = BUILTIN
            .iter()
            .map(|(id, prompt, options, correct, category)| {
                Question::new(
                    QuestionId::new(*id),
                    *prompt,
                    options.map(String::from),
                    *correct,
                    *category,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct categories in bank order.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.questions
            .iter()
            .map(Question::category)
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Shuffle and take up to `count` questions.
    ///
    /// With a seed the draw is reproducible; without one it uses OS entropy and is not.
    #[must_use]
    pub fn draw(&self, count: usize, seed: Option<u64>) -> Vec<Question> {
        shuffled_take(self.questions.clone(), count, seed)
    }

    /// Like [`QuestionBank::draw`] but restricted to one category (case-insensitive).
    #[must_use]
    pub fn by_category(
        &self,
        category: &str,
        count: usize,
        seed: Option<u64>,
    ) -> Vec<Question> {
        let pool = self
            .questions
            .iter()
            .filter(|q| q.category().eq_ignore_ascii_case(category.trim()))
            .cloned()
            .collect();
        shuffled_take(pool, count, seed)
    }
}

fn shuffled_take(mut pool: Vec<Question>, count: usize, seed: Option<u64>) -> Vec<Question> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    pool.shuffle(&mut rng);
    pool.truncate(count);
    pool
}

type Row = (u64, &'static str, [&'static str; 4], usize, &'static str);

const BUILTIN: &[Row] = &[
    // Geography
    (1, "What is the capital of France?", ["London", "Paris", "Berlin", "Madrid"], 1, "Geography"),
    (2, "Which is the largest ocean?", ["Atlantic", "Indian", "Arctic", "Pacific"], 3, "Geography"),
    (3, "How many continents are there on Earth?", ["5", "6", "7", "8"], 2, "Geography"),
    (4, "In which country is the Eiffel Tower?", ["Italy", "Spain", "France", "Germany"], 2, "Geography"),
    (5, "On which continent is Egypt?", ["Asia", "Europe", "Africa", "America"], 2, "Geography"),
    (6, "What is the largest country in the world by area?", ["China", "Canada", "United States", "Russia"], 3, "Geography"),
    (7, "Which country is shaped like a boot?", ["Greece", "Italy", "Spain", "Portugal"], 1, "Geography"),
    // History
    (8, "In which year did humans first land on the Moon?", ["1965", "1969", "1972", "1975"], 1, "History"),
    (9, "In which year did the Berlin Wall fall?", ["1987", "1989", "1991", "1993"], 1, "History"),
    (10, "Who was the first president of the United States?", ["Thomas Jefferson", "Abraham Lincoln", "George Washington", "John Adams"], 2, "History"),
    (11, "In which year did World War II begin?", ["1935", "1937", "1939", "1941"], 2, "History"),
    (12, "Who painted the Sistine Chapel ceiling?", ["Leonardo da Vinci", "Michelangelo", "Raphael", "Donatello"], 1, "History"),
    // Science
    (13, "Which is the largest planet in the solar system?", ["Saturn", "Neptune", "Jupiter", "Uranus"], 2, "Science"),
    (14, "Which chemical element has the symbol 'Au'?", ["Silver", "Gold", "Aluminium", "Iron"], 1, "Science"),
    (15, "How many bones are in the adult human body?", ["186", "206", "226", "246"], 1, "Science"),
    (16, "Which gas do humans need to breathe?", ["Nitrogen", "Oxygen", "Hydrogen", "Carbon dioxide"], 1, "Science"),
    (17, "Roughly how fast does light travel?", ["300,000 km/s", "150,000 km/s", "450,000 km/s", "600,000 km/s"], 0, "Science"),
    (18, "Who developed the theory of relativity?", ["Isaac Newton", "Albert Einstein", "Stephen Hawking", "Galileo Galilei"], 1, "Science"),
    (19, "Which planet is closest to the Sun?", ["Venus", "Mars", "Mercury", "Earth"], 2, "Science"),
    // Art
    (20, "Who painted the Mona Lisa?", ["Vincent van Gogh", "Pablo Picasso", "Leonardo da Vinci", "Claude Monet"], 2, "Art"),
    (21, "Who painted 'The Starry Night'?", ["Pablo Picasso", "Vincent van Gogh", "Claude Monet", "Salvador Dalí"], 1, "Art"),
    // Nature
    (22, "What is the fastest land animal?", ["Lion", "Cheetah", "Horse", "Gazelle"], 1, "Nature"),
    (23, "What is the largest mammal?", ["African elephant", "Blue whale", "Giraffe", "Hippopotamus"], 1, "Nature"),
    (24, "How many legs does a spider have?", ["6", "8", "10", "12"], 1, "Nature"),
    // Maths
    (25, "What is 7 × 8?", ["54", "56", "58", "64"], 1, "Maths"),
    (26, "What is the square root of 144?", ["10", "11", "12", "14"], 2, "Maths"),
    (27, "How many sides does a hexagon have?", ["5", "6", "7", "8"], 1, "Maths"),
    // Sports
    (28, "How many players does a football (soccer) team field?", ["9", "10", "11", "12"], 2, "Sports"),
    (29, "Every how many years are the Summer Olympics held?", ["2", "3", "4", "5"], 2, "Sports"),
    // Music
    (30, "How many strings does a standard guitar have?", ["4", "5", "6", "7"], 2, "Music"),
    (31, "Who composed the 'Moonlight Sonata'?", ["Mozart", "Bach", "Beethoven", "Chopin"], 2, "Music"),
    // Film
    (32, "Which film features the character Jack Sparrow?", ["Titanic", "Pirates of the Caribbean", "Peter Pan", "Hook"], 1, "Film"),
    // Technology
    (33, "Who co-founded Microsoft with Paul Allen?", ["Steve Jobs", "Bill Gates", "Mark Zuckerberg", "Larry Page"], 1, "Technology"),
    (34, "What does 'CPU' stand for?", ["Central Processing Unit", "Computer Personal Unit", "Central Program Utility", "Core Processing Unit"], 0, "Technology"),
    // Literature
    (35, "Who wrote 'One Hundred Years of Solitude'?", ["Pablo Neruda", "Gabriel García Márquez", "Jorge Luis Borges", "Octavio Paz"], 1, "Literature"),
    (36, "Who wrote 'Don Quixote'?", ["Lope de Vega", "Miguel de Cervantes", "Federico García Lorca", "Benito Pérez Galdós"], 1, "Literature"),
    // General knowledge
    (37, "How many days are in a leap year?", ["364", "365", "366", "367"], 2, "General"),
    (38, "What colour do you get by mixing blue and yellow?", ["Purple", "Orange", "Green", "Brown"], 2, "General"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bank_is_valid() {
        let bank = QuestionBank::builtin().unwrap();
        assert!(bank.len() >= 30);
        assert!(bank.categories().contains(&"Science"));
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let bank = QuestionBank::builtin().unwrap();
        let a: Vec<_> = bank.draw(10, Some(42)).iter().map(Question::id).collect();
        let b: Vec<_> = bank.draw(10, Some(42)).iter().map(Question::id).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn draw_caps_at_bank_size() {
        let bank = QuestionBank::builtin().unwrap();
        assert_eq!(bank.draw(1_000, Some(1)).len(), bank.len());
    }

    #[test]
    fn category_draw_filters() {
        let bank = QuestionBank::builtin().unwrap();
        let drawn = bank.by_category("history", 3, Some(7));
        assert_eq!(drawn.len(), 3);
        assert!(drawn.iter().all(|q| q.category() == "History"));
    }

    #[test]
    fn json_bank_rejects_duplicates_and_empty() {
        let dup = r#"[
            {"id":1,"prompt":"A","options":["a","b","c","d"],"correct_option_index":0,"category":"X"},
            {"id":1,"prompt":"B","options":["a","b","c","d"],"correct_option_index":1,"category":"X"}
        ]"#;
        assert!(matches!(
            QuestionBank::from_json(dup),
            Err(BankError::DuplicateId(_))
        ));
        assert!(matches!(QuestionBank::from_json("[]"), Err(BankError::Empty)));
        assert!(matches!(
            QuestionBank::from_json("{"),
            Err(BankError::Json(_))
        ));
    }
}
