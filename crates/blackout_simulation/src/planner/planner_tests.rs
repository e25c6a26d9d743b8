//! Tests for the action planner (catalog invariants, search, tie-breaks).

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::config::PlannerConfig;

    fn planner() -> ActionPlanner {
        ActionPlanner::new(ActionCatalog::standard(), PlannerConfig::default())
    }

    fn eliminate() -> Goal {
        Goal::new(
            GoalKind::EliminateTarget,
            vec![(Fact::PlayerSuppressed, Requirement::Flag(true))],
        )
    }

    fn detected() -> WorldStateFacts {
        WorldStateFacts::new()
            .with_flag(Fact::PlayerDetected, true)
            .with_flag(Fact::HasAmmo, true)
    }

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = ActionCatalog::standard();
        assert_eq!(catalog.validate(), Ok(()));
        assert_eq!(catalog.actions().len(), 18);
        assert!(catalog
            .get(ActionKind::CoordinatedAssault)
            .is_some_and(|a| a.is_disabled()));
    }

    #[test]
    fn test_catalog_rejects_action_without_progress() {
        let catalog = ActionCatalog::new(vec![ActionDef::new(ActionKind::HoldPosition, "noop", 1.0)
            .requires_flag(Fact::InCover, true)
            .sets(Fact::InCover, true)]);
        assert_eq!(catalog.validate(), Err(CatalogError::NoProgress("noop")));
    }

    #[test]
    fn test_catalog_rejects_cost_below_one() {
        let catalog = ActionCatalog::standard().with_cost(ActionKind::Flank, 0.4);
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::InvalidCost {
                name: "flank",
                cost: 0.4
            })
        );

        let floor = ActionCatalog::standard().with_cost(ActionKind::Flank, MIN_ACTION_COST);
        assert_eq!(floor.validate(), Ok(()));
    }

    #[test]
    fn test_pursue_then_attack_when_not_hittable() {
        let plan = planner().plan(&detected(), &eliminate()).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::Pursue, ActionKind::Attack]);
        assert_eq!(plan.cost, 4.0);
    }

    #[test]
    fn test_flank_preferred_when_available() {
        let facts = detected().with_flag(Fact::FlankAvailable, true);
        let plan = planner().plan(&facts, &eliminate()).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::Flank, ActionKind::Attack]);
    }

    #[test]
    fn test_rush_reloading_target() {
        let facts = detected().with_flag(Fact::PlayerReloading, true);
        let plan = planner().plan(&facts, &eliminate()).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::RushReloadingTarget, ActionKind::Attack]);
    }

    #[test]
    fn test_grenade_over_long_approach() {
        let facts = detected()
            .with_flag(Fact::HasGrenade, true)
            .with_flag(Fact::TargetInThrowRange, true);
        let plan = planner().plan(&facts, &eliminate()).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::ThrowGrenade]);
    }

    #[test]
    fn test_reload_ordered_first_on_equal_cost() {
        let facts = WorldStateFacts::new()
            .with_flag(Fact::PlayerDetected, true)
            .with_flag(Fact::HasAmmo, false);
        let plan = planner().plan(&facts, &eliminate()).expect("plan");
        // [Reload, Pursue, Attack] и [Pursue, Reload, Attack] равны по cost и длине
        assert_eq!(
            plan.steps,
            vec![ActionKind::Reload, ActionKind::Pursue, ActionKind::Attack]
        );
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let facts = WorldStateFacts::new()
            .with_flag(Fact::HeardNoise, true)
            .with_flag(Fact::PassageLit, true);
        let goal = select_goal(&facts).expect("goal");
        let plan = planner().plan(&facts, &goal).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::InvestigateNoise]);
    }

    #[test]
    fn test_satisfied_goal_gives_empty_plan() {
        let facts = WorldStateFacts::new().with_flag(Fact::PlayerSuppressed, true);
        let plan = planner().plan(&facts, &eliminate()).expect("plan");
        assert!(plan.is_empty());
        assert_eq!(plan.cost, 0.0);
    }

    #[test]
    fn test_stay_safe_prefers_cover_over_retreat() {
        let facts = WorldStateFacts::new()
            .with_flag(Fact::LowHealth, true)
            .with_flag(Fact::CoverAvailable, true);
        let goal = select_goal(&facts).expect("goal");
        assert_eq!(goal.kind, GoalKind::StaySafe);
        let plan = planner().plan(&facts, &goal).expect("plan");
        assert_eq!(plan.steps, vec![ActionKind::SeekCover]);
    }

    #[test]
    fn test_only_viable_action_disabled_gives_no_plan() {
        let catalog = ActionCatalog::standard().with_cost(ActionKind::Pursue, DISABLED_COST);
        let planner = ActionPlanner::new(catalog, PlannerConfig::default());
        let goal = Goal::new(
            GoalKind::EliminateTarget,
            vec![(Fact::PlayerReachableForAttack, Requirement::Flag(true))],
        );

        let result = planner.plan(&detected(), &goal);
        assert!(matches!(result, Err(NoPlan { goal: GoalKind::EliminateTarget, .. })));
    }

    #[test]
    fn test_disabled_assault_never_selected() {
        let catalog = ActionCatalog::new(vec![ActionCatalog::standard()
            .get(ActionKind::CoordinatedAssault)
            .cloned()
            .expect("assault")]);
        let planner = ActionPlanner::new(catalog, PlannerConfig::default());
        let mut facts = detected();
        facts.set_scalar(Fact::AlliesInCombat, 4.0);

        assert!(planner.plan(&facts, &eliminate()).is_err());
    }

    #[test]
    fn test_expansion_budget_bounds_search() {
        let config = PlannerConfig {
            max_expansions: 1,
            ..PlannerConfig::default()
        };
        let planner = ActionPlanner::new(ActionCatalog::standard(), config);
        let result = planner.plan(&detected(), &eliminate());
        assert_eq!(
            result,
            Err(NoPlan {
                goal: GoalKind::EliminateTarget,
                expanded: 2
            })
        );
    }

    #[test]
    fn test_depth_limit_bounds_search() {
        let config = PlannerConfig {
            max_depth: 1,
            ..PlannerConfig::default()
        };
        let planner = ActionPlanner::new(ActionCatalog::standard(), config);
        assert!(planner.plan(&detected(), &eliminate()).is_err());
    }
}
