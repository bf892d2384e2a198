//! Persona resolution — a pure classification of the accumulated answers
//! that script resolvers use to pick tone and emphasis. The engine never
//! branches on it.

use serde::{Deserialize, Serialize};

use crate::state::{Answers, EmploymentType, Product};

/// Coarse customer archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[default]
    FirstTimer,
    FamilyOriented,
    Senior,
    SelfEmployed,
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FirstTimer => "first_timer",
            Self::FamilyOriented => "family_oriented",
            Self::Senior => "senior",
            Self::SelfEmployed => "self_employed",
        };
        write!(f, "{s}")
    }
}

/// Resolve the persona for the current state. Precedence: age, then
/// household, then employment; the earliest strong signal wins.
pub fn resolve(answers: &Answers) -> Persona {
    if answers.profile.age.is_some_and(|age| age >= 55) {
        return Persona::Senior;
    }

    let covers_family = answers.product == Some(Product::Health)
        && answers
            .health
            .members
            .as_ref()
            .is_some_and(|members| members.len() > 1);
    if covers_family {
        return Persona::FamilyOriented;
    }

    if matches!(
        answers.income.employment,
        Some(EmploymentType::Business) | Some(EmploymentType::Professional)
    ) {
        return Persona::SelfEmployed;
    }

    Persona::FirstTimer
}
