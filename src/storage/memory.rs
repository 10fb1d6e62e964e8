use rocket::tokio::sync::Mutex;

use crate::error::Result;
use crate::model::{
    common::{election::ElectionStatus, role::Role},
    db::{
        election::{Ballot, Election, ElectionChanges, NewElection, UpdateGuard},
        user::{NewUser, User},
    },
    mongodb::Id,
};

use super::Storage;

#[derive(Default)]
struct Documents {
    elections: Vec<Election>,
    users: Vec<User>,
}

impl Documents {
    fn election_mut(&mut self, id: Id) -> Option<&mut Election> {
        self.elections.iter_mut().find(|e| e.id == id)
    }
}

/// Storage held entirely in process memory.
///
/// A single lock serialises all writes, which makes every check-then-modify
/// sequence below atomic.
#[derive(Default)]
pub struct MemoryStorage {
    documents: Mutex<Documents>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl Storage for MemoryStorage {
    async fn election(&self, id: Id) -> Result<Option<Election>> {
        let documents = self.documents.lock().await;
        Ok(documents.elections.iter().find(|e| e.id == id).cloned())
    }

    async fn elections(&self, status: Option<ElectionStatus>) -> Result<Vec<Election>> {
        let documents = self.documents.lock().await;
        Ok(documents
            .elections
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect())
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let election = Election {
            id: Id::new(),
            election,
        };
        self.documents.lock().await.elections.push(election.clone());
        Ok(election)
    }

    async fn update_election(
        &self,
        id: Id,
        guard: UpdateGuard,
        changes: &ElectionChanges,
    ) -> Result<Option<Election>> {
        let mut documents = self.documents.lock().await;
        Ok(documents
            .election_mut(id)
            .filter(|election| guard.holds_for(election))
            .map(|election| {
                changes.apply_to(election);
                election.clone()
            }))
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut documents = self.documents.lock().await;
        let before = documents.elections.len();
        documents.elections.retain(|e| e.id != id);
        Ok(documents.elections.len() != before)
    }

    async fn append_ballot(&self, id: Id, ballot: &Ballot) -> Result<bool> {
        let mut documents = self.documents.lock().await;
        let election = match documents.election_mut(id) {
            Some(election) => election,
            None => return Ok(false),
        };
        let acceptable = election.status.accepts_votes()
            && election.candidate(ballot.candidate_id).is_some()
            && election.ballot_of(ballot.voter_id).is_none();
        if acceptable {
            election.ballots.push(ballot.clone());
        }
        Ok(acceptable)
    }

    async fn pull_ballot(&self, id: Id, voter_id: Id) -> Result<Option<Election>> {
        let mut documents = self.documents.lock().await;
        Ok(documents.election_mut(id).map(|election| {
            let before = election.clone();
            election.ballots.retain(|b| b.voter_id != voter_id);
            before
        }))
    }

    async fn clear_ballots(&self, id: Id) -> Result<Option<Election>> {
        let mut documents = self.documents.lock().await;
        Ok(documents.election_mut(id).map(|election| {
            let before = election.clone();
            election.ballots.clear();
            before
        }))
    }

    async fn count_elections(&self, status: Option<ElectionStatus>) -> Result<u64> {
        let documents = self.documents.lock().await;
        let count = documents
            .elections
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .count();
        Ok(count as u64)
    }

    async fn count_ballots(&self) -> Result<u64> {
        let documents = self.documents.lock().await;
        let count: usize = documents.elections.iter().map(|e| e.ballots.len()).sum();
        Ok(count as u64)
    }

    async fn user(&self, id: Id) -> Result<Option<User>> {
        let documents = self.documents.lock().await;
        Ok(documents.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let documents = self.documents.lock().await;
        Ok(documents.users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<Option<User>> {
        let mut documents = self.documents.lock().await;
        if documents.users.iter().any(|u| u.email == user.email) {
            return Ok(None);
        }
        let user = User {
            id: Id::new(),
            user,
        };
        documents.users.push(user.clone());
        Ok(Some(user))
    }

    async fn set_role(&self, id: Id, role: Role) -> Result<Option<User>> {
        let mut documents = self.documents.lock().await;
        Ok(documents.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn count_voters(&self) -> Result<u64> {
        let documents = self.documents.lock().await;
        let count = documents
            .users
            .iter()
            .filter(|u| u.role == Role::User)
            .count();
        Ok(count as u64)
    }
}
