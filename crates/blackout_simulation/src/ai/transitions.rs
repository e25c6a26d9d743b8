//! Authoritative transition table
//!
//! Каждое ребро перечислено явно. Переход, которого нет в таблице, state machine
//! не выполняет (и пишет warning). Dead не имеет исходящих рёбер.

use super::state::StateKind;

/// Разрешён ли переход from → to
pub fn allowed_transition(from: StateKind, to: StateKind) -> bool {
    use StateKind::*;

    if from == to {
        return false;
    }

    match from {
        Idle => matches!(
            to,
            Patrol | Combat | Pursuing | Searching | InCover | Retreating | EvadingGrenade | Dead
        ),
        Patrol => matches!(
            to,
            Idle | Combat | Pursuing | Searching | InCover | Retreating | EvadingGrenade | Dead
        ),
        Combat => matches!(
            to,
            Pursuing
                | Flanking
                | Searching
                | InCover
                | Retreating
                | EvadingGrenade
                | ReadyToThrow
                | Dead
        ),
        Pursuing => matches!(
            to,
            Combat
                | Flanking
                | Searching
                | InCover
                | Retreating
                | EvadingGrenade
                | ReadyToThrow
                | Dead
        ),
        Flanking => matches!(
            to,
            Combat | Pursuing | Searching | InCover | Retreating | EvadingGrenade | Dead
        ),
        Searching => matches!(
            to,
            Idle | Patrol | Combat | Pursuing | InCover | Retreating | EvadingGrenade | Dead
        ),
        InCover => matches!(
            to,
            Idle | Patrol | Combat | Pursuing | Searching | Retreating | EvadingGrenade | Dead
        ),
        Retreating => matches!(
            to,
            Idle | Patrol | Searching | InCover | EvadingGrenade | Dead
        ),
        EvadingGrenade => matches!(
            to,
            Idle | Patrol
                | Combat
                | Pursuing
                | Flanking
                | Searching
                | InCover
                | Retreating
                | Dead
        ),
        ReadyToThrow => matches!(to, ThrowingGrenade | Dead),
        ThrowingGrenade => matches!(to, Combat | Pursuing | Dead),
        Dead => false,
    }
}

/// Все разрешённые выходы из состояния (для тулинга и тестов)
pub fn outgoing(from: StateKind) -> Vec<StateKind> {
    StateKind::ALL
        .into_iter()
        .filter(|to| allowed_transition(from, *to))
        .collect()
}
