use serde::Serialize;

/// Role of an agent in the recruitment model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// No task. May join a leader or pick up a pheromone role.
    Unassigned,
    /// Member of the group led by `leader`.
    Follower { leader: usize },
    /// Recruits followers. Meeting its own follower promotes the whole group;
    /// meeting anyone else may dissolve it.
    Leader,
    /// Marks the way. Drops the role after meeting a non-pheromone agent.
    Pheromone,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::Follower { .. } => "follower",
            Role::Leader => "leader",
            Role::Pheromone => "pheromone",
        }
    }
}

/// Number of agents per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub unassigned: usize,
    pub followers: usize,
    pub leaders: usize,
    pub pheromone: usize,
}

impl RoleCounts {
    pub fn add(&mut self, role: Role) {
        match role {
            Role::Unassigned => self.unassigned += 1,
            Role::Follower { .. } => self.followers += 1,
            Role::Leader => self.leaders += 1,
            Role::Pheromone => self.pheromone += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unassigned + self.followers + self.leaders + self.pheromone
    }
}

impl FromIterator<Role> for RoleCounts {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut counts = RoleCounts::default();
        for role in iter {
            counts.add(role);
        }
        counts
    }
}
