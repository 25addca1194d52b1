use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::UserId;
use quiz_core::model::credentials::{profile_name, truncate_profile_name};
use quiz_core::quiz::{AnswerRecord, FinalStandings};
use storage::repository::{
    GameResultRecord, GameResultRepository, StoredAnswer, UserProfile, UserRepository,
};

use crate::error::ProfileError;

/// Aggregate over every stored game of one account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserStats {
    pub quizzes_completed: u32,
    pub total_points: u64,
    /// Mean score per game, rounded to two decimals. Zero without games.
    pub average_score: f64,
    pub correct_answers: u64,
}

/// Profile rows and per-game results for authenticated accounts.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    results: Arc<dyn GameResultRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        results: Arc<dyn GameResultRepository>,
    ) -> Self {
        Self {
            clock,
            users,
            results,
        }
    }

    /// Create the profile on first sign-in, or refresh its email and name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Storage` on repository failures.
    pub async fn ensure_profile(
        &self,
        user_id: UserId,
        email: &str,
        name: Option<&str>,
    ) -> Result<UserProfile, ProfileError> {
        let now = self.clock.now();
        match self.users.get_user(user_id).await? {
            Some(mut profile) => {
                let name = name.and_then(truncate_profile_name);
                let changed = profile.email != email || (name.is_some() && profile.name != name);
                if changed {
                    profile.email = email.to_string();
                    if name.is_some() {
                        profile.name = name;
                    }
                    profile.updated_at = now;
                    self.users.update_user(&profile).await?;
                }
                Ok(profile)
            }
            None => {
                let profile = UserProfile::new(user_id, email, name, now);
                self.users.insert_user(&profile).await?;
                tracing::info!(user = %user_id, "created profile");
                Ok(profile)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Storage` on repository failures.
    pub async fn profile(&self, user_id: UserId) -> Result<Option<UserProfile>, ProfileError> {
        Ok(self.users.get_user(user_id).await?)
    }

    /// Rename a profile. The name is trimmed and must fit the profile limit.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Credential` for invalid names and
    /// `ProfileError::MissingProfile` if the account has no profile.
    pub async fn update_name(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<UserProfile, ProfileError> {
        let name = profile_name(name)?;
        let mut profile = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ProfileError::MissingProfile(user_id))?;
        profile.name = Some(name);
        profile.updated_at = self.clock.now();
        self.users.update_user(&profile).await?;
        Ok(profile)
    }

    /// Store one result per seat linked to an account and credit its points.
    /// Guest seats are skipped. Returns the ids of the stored results.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::MissingProfile` if a linked account has no
    /// profile, or `ProfileError::Storage` on repository failures.
    pub async fn record_game(
        &self,
        standings: &FinalStandings,
        answers: &[AnswerRecord],
    ) -> Result<Vec<i64>, ProfileError> {
        let now = self.clock.now();
        let mut ids = Vec::new();

        for player in standings.players() {
            let Some(user_id) = player.account() else {
                continue;
            };
            let mut profile = self
                .users
                .get_user(user_id)
                .await?
                .ok_or(ProfileError::MissingProfile(user_id))?;

            let turns: Vec<StoredAnswer> = answers
                .iter()
                .filter(|a| &a.player_id == player.id())
                .map(StoredAnswer::from)
                .collect();
            let correct = turns.iter().filter(|a| a.correct).count();
            let record = GameResultRecord {
                id: None,
                user_id,
                score: player.score(),
                correct_answers: u32::try_from(correct).unwrap_or(u32::MAX),
                total_questions: u32::try_from(turns.len()).unwrap_or(u32::MAX),
                answers: turns,
                completed_at: now,
            };
            let id = self.results.append_result(&record).await?;

            profile.points = profile.points.saturating_add(u64::from(player.score()));
            profile.updated_at = now;
            self.users.update_user(&profile).await?;

            tracing::info!(user = %user_id, score = player.score(), result_id = id, "recorded game");
            ids.push(id);
        }

        Ok(ids)
    }

    /// # Errors
    ///
    /// Returns `ProfileError::Storage` on repository failures.
    pub async fn stats(&self, user_id: UserId) -> Result<UserStats, ProfileError> {
        let results = self.results.list_results(user_id).await?;
        Ok(stats_from(&results))
    }

    /// Stored games, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Storage` on repository failures.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<GameResultRecord>, ProfileError> {
        Ok(self.results.list_results(user_id).await?)
    }
}

fn stats_from(results: &[GameResultRecord]) -> UserStats {
    let quizzes_completed = u32::try_from(results.len()).unwrap_or(u32::MAX);
    let total_points: u64 = results.iter().map(|r| u64::from(r.score)).sum();
    let correct_answers: u64 = results.iter().map(|r| u64::from(r.correct_answers)).sum();
    #[allow(clippy::cast_precision_loss)]
    let average_score = if quizzes_completed == 0 {
        0.0
    } else {
        let mean = total_points as f64 / f64::from(quizzes_completed);
        (mean * 100.0).round() / 100.0
    };
    UserStats {
        quizzes_completed,
        total_points,
        average_score,
        correct_answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Player, PlayerId, QuestionId};
    use quiz_core::quiz::finalize;
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::Storage;

    fn service() -> ProfileService {
        let storage = Storage::in_memory();
        ProfileService::new(fixed_clock(), storage.users, storage.results)
    }

    fn record(player: &str, question: u64, correct: bool, points: u32) -> AnswerRecord {
        AnswerRecord {
            question_id: QuestionId::new(question),
            player_id: PlayerId::new(player),
            selected: Some(0),
            correct,
            points,
            seconds_remaining: 10,
        }
    }

    #[tokio::test]
    async fn ensure_profile_inserts_once_then_refreshes() {
        let svc = service();
        let id = UserId::generate();
        let created = svc
            .ensure_profile(id, "ana@example.com", Some("Ana"))
            .await
            .unwrap();
        assert_eq!(created.level, 1);
        assert_eq!(created.points, 0);
        assert_eq!(created.created_at, fixed_now());

        let again = svc
            .ensure_profile(id, "ana@example.com", None)
            .await
            .unwrap();
        assert_eq!(again.name.as_deref(), Some("Ana"));

        let renamed = svc
            .ensure_profile(id, "ana@example.com", Some("Ana Sofía"))
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Ana Sofía"));
    }

    #[tokio::test]
    async fn update_name_validates() {
        let svc = service();
        let id = UserId::generate();
        assert!(matches!(
            svc.update_name(id, "Ana").await,
            Err(ProfileError::MissingProfile(_))
        ));
        svc.ensure_profile(id, "ana@example.com", None).await.unwrap();
        assert!(matches!(
            svc.update_name(id, "   ").await,
            Err(ProfileError::Credential(_))
        ));
        assert!(matches!(
            svc.update_name(id, "sixteen chars!!!").await,
            Err(ProfileError::Credential(_))
        ));
        let profile = svc.update_name(id, "  Anita ").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Anita"));
    }

    #[tokio::test]
    async fn record_game_credits_linked_seats_only() {
        let svc = service();
        let ana = UserId::generate();
        svc.ensure_profile(ana, "ana@example.com", Some("Ana"))
            .await
            .unwrap();

        let standings = finalize(vec![
            Player::new(PlayerId::new("p1"), "Ana", "red")
                .unwrap()
                .with_account(ana)
                .with_score(250),
            Player::new(PlayerId::new("p2"), "Guest", "blue")
                .unwrap()
                .with_score(100),
        ]);
        let answers = vec![
            record("p1", 1, true, 150),
            record("p2", 2, true, 100),
            record("p1", 3, true, 100),
            record("p2", 4, false, 0),
        ];

        let ids = svc.record_game(&standings, &answers).await.unwrap();
        assert_eq!(ids.len(), 1);

        let history = svc.history(ana).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 250);
        assert_eq!(history[0].correct_answers, 2);
        assert_eq!(history[0].total_questions, 2);

        let profile = svc.profile(ana).await.unwrap().unwrap();
        assert_eq!(profile.points, 250);
    }

    #[tokio::test]
    async fn record_game_needs_a_profile() {
        let svc = service();
        let standings = finalize(vec![
            Player::new(PlayerId::new("p1"), "Ana", "red")
                .unwrap()
                .with_account(UserId::generate()),
        ]);
        assert!(matches!(
            svc.record_game(&standings, &[]).await,
            Err(ProfileError::MissingProfile(_))
        ));
    }

    #[test]
    fn stats_average_rounds_to_two_decimals() {
        let result = |score| GameResultRecord {
            id: None,
            user_id: UserId::generate(),
            score,
            correct_answers: 2,
            total_questions: 3,
            answers: Vec::new(),
            completed_at: fixed_now(),
        };
        let stats = stats_from(&[result(100), result(100), result(150)]);
        assert_eq!(stats.quizzes_completed, 3);
        assert_eq!(stats.total_points, 350);
        assert_eq!(stats.correct_answers, 6);
        assert!((stats.average_score - 116.67).abs() < f64::EPSILON * 1000.0);

        let empty = stats_from(&[]);
        assert_eq!(empty.quizzes_completed, 0);
        assert!(empty.average_score.abs() < f64::EPSILON);
    }
}
