//! Current score per (competition, team)

use crate::error::Result;
use crate::store::Transaction;
use crate::types::{CompetitionId, Rating, Score, TeamId};

/// Reads and writes current scores inside the announce transaction
#[derive(Debug, Clone, Copy)]
pub struct ScoreBook {
    initial: Rating,
}

impl ScoreBook {
    pub fn new(initial: Rating) -> Self {
        Self { initial }
    }

    /// Current score of the team, created at the prior if the team has not
    /// played in this competition yet
    pub async fn get_or_init(
        &self,
        tx: &mut dyn Transaction,
        competition_id: CompetitionId,
        team_id: TeamId,
    ) -> Result<Score> {
        if let Some(score) = tx.score(competition_id, team_id).await? {
            return Ok(score);
        }

        let score = Score::initial(competition_id, team_id, self.initial);
        tx.put_score(score.clone()).await?;
        Ok(score)
    }

    pub async fn commit(&self, tx: &mut dyn Transaction, score: Score) -> Result<()> {
        tx.put_score(score).await
    }

    pub fn initial(&self) -> Rating {
        self.initial
    }
}
