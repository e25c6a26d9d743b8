//! Tactical AI config
//!
//! Все tuning константы (дальности, confidence по типам стимулов, пороги здоровья,
//! таймауты) живут здесь, а не в логике. Структура алгоритмов от них не зависит.
//!
//! Единицы: пиксели мира (top-down 2D), секунды.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ошибка загрузки/валидации config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Полный config тактического AI (attached per agent)
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TacticalConfig {
    pub perception: PerceptionConfig,
    pub memory: MemoryConfig,
    pub combat: CombatConfig,
    pub movement: MovementConfig,
    pub planner: PlannerConfig,
}

/// Зрение, слух, световые конусы
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Полный угол обзора (градусы)
    pub fov_degrees: f32,
    /// Дальность зрения
    pub vision_range: f32,
    /// Количество лучей веера (нечётное: центральный луч = направление взгляда)
    pub ray_count: u32,
    /// Радиус тела цели для попадания луча
    pub target_radius: f32,
    /// Дальность распространения звуков (при intensity = 1.0)
    pub gunshot_range: f32,
    pub reload_range: f32,
    pub empty_click_range: f32,
    pub grenade_landing_range: f32,
    /// Минимальная confidence свежего стимула, на которую реагирует Idle/Patrol/Searching
    pub min_reaction_confidence: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 100.0,
            vision_range: 600.0,
            ray_count: 17,
            target_radius: 16.0,
            gunshot_range: 900.0,
            reload_range: 350.0,
            empty_click_range: 250.0,
            grenade_landing_range: 600.0,
            min_reaction_confidence: 0.2,
        }
    }
}

/// Confidence по типам стимулов + decay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Потеря confidence в секунду без подтверждения
    pub decay_rate: f32,
    pub seen_confidence: f32,
    pub heard_shot_confidence: f32,
    pub heard_reload_confidence: f32,
    pub flashlight_confidence: f32,
    pub ally_alert_confidence: f32,
    /// Сколько секунд после звука перезарядки считаем цель "перезаряжающейся"
    pub reload_window: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.1, // 10 секунд от полной уверенности до нуля
            seen_confidence: 1.0,
            heard_shot_confidence: 0.7,
            heard_reload_confidence: 0.6,
            flashlight_confidence: 0.8,
            ally_alert_confidence: 0.5,
            reload_window: 2.5,
        }
    }
}

/// Пороги здоровья, укрытия, отступление, гранаты
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Получили урон и здоровье ниже порога → ищем укрытие
    pub cover_health_threshold: f32,
    /// Здоровье ниже порога → low_health (укрытие или отступление)
    pub retreat_health_threshold: f32,
    /// Здоровье выше порога → считаем восстановившимся
    pub recovered_health_threshold: f32,
    /// Сколько держим укрытие без новых стимулов
    pub cover_safe_duration: f32,
    /// Дистанция от угрозы, на которой отступление завершено
    pub retreat_safe_distance: f32,
    /// Длина одного шага отступления
    pub retreat_step: f32,
    pub retreat_max_duration: f32,
    pub grenade_throw_range: f32,
    /// Запас к радиусу взрыва при оценке угрозы
    pub grenade_danger_margin: f32,
    pub ready_to_throw_duration: f32,
    pub throw_duration: f32,
    pub evade_timeout: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            cover_health_threshold: 0.6,
            retreat_health_threshold: 0.3,
            recovered_health_threshold: 0.8,
            cover_safe_duration: 4.0,
            retreat_safe_distance: 500.0,
            retreat_step: 250.0,
            retreat_max_duration: 6.0,
            grenade_throw_range: 450.0,
            grenade_danger_margin: 40.0,
            ready_to_throw_duration: 0.4,
            throw_duration: 0.5,
            evade_timeout: 4.0,
        }
    }
}

/// Перемещение: фланг, поиск, stall detector, idle scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Радиус "дошли до точки"
    pub arrival_radius: f32,
    /// Смещение фланговой позиции от цели (перпендикуляр к оси агент→цель)
    pub flank_distance: f32,
    pub flank_timeout: f32,
    pub search_radius: f32,
    pub search_points: u32,
    pub search_duration: f32,
    /// Окно stall detector (секунды)
    pub stall_window: f32,
    /// Смещение за окно, ниже которого считаем что застряли
    pub stall_epsilon: f32,
    /// Скорость idle sweep (рад/сек) и полуамплитуда (рад)
    pub idle_scan_speed: f32,
    pub idle_scan_half_arc: f32,
    /// Расстояние отхода от центра взрыва сверх радиуса
    pub evade_clearance: f32,
    /// Сколько стоим в Idle перед возвратом на маршрут патруля
    pub idle_dwell: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            arrival_radius: 24.0,
            flank_distance: 200.0,
            flank_timeout: 6.0,
            search_radius: 150.0,
            search_points: 4,
            search_duration: 8.0,
            stall_window: 0.75,
            stall_epsilon: 4.0,
            idle_scan_speed: 1.2,
            idle_scan_half_arc: 1.0,
            evade_clearance: 60.0,
            idle_dwell: 2.0,
        }
    }
}

/// Ограничения A* планировщика
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub max_depth: usize,
    pub max_expansions: usize,
    /// Пауза перед повторным планированием после NoPlan (секунды)
    pub replan_interval: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_expansions: 512,
            replan_interval: 0.5,
        }
    }
}

impl TacticalConfig {
    /// Загрузить config из JSON (отсутствующие поля = default)
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: TacticalConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить config или вернуть default (с warning в лог)
    pub fn from_json_or_default(source: &str) -> Self {
        match Self::from_json(source) {
            Ok(config) => config,
            Err(error) => {
                crate::log_warning(&format!("TacticalConfig: {} → using defaults", error));
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.perception;
        positive("perception.vision_range", p.vision_range)?;
        positive("perception.fov_degrees", p.fov_degrees)?;
        positive("perception.target_radius", p.target_radius)?;
        if p.ray_count == 0 {
            return Err(invalid("perception.ray_count", "must be at least 1"));
        }

        let m = &self.memory;
        positive("memory.decay_rate", m.decay_rate)?;
        if (m.seen_confidence - 1.0).abs() > f32::EPSILON {
            return Err(invalid("memory.seen_confidence", "visual confidence is ground truth (1.0)"));
        }
        for (field, value) in [
            ("memory.heard_shot_confidence", m.heard_shot_confidence),
            ("memory.heard_reload_confidence", m.heard_reload_confidence),
            ("memory.flashlight_confidence", m.flashlight_confidence),
            ("memory.ally_alert_confidence", m.ally_alert_confidence),
        ] {
            if !(value > 0.0 && value < m.seen_confidence) {
                return Err(invalid(field, "must be in (0, seen_confidence)"));
            }
        }

        let c = &self.combat;
        if c.retreat_health_threshold > c.recovered_health_threshold {
            return Err(invalid(
                "combat.retreat_health_threshold",
                "must not exceed recovered_health_threshold",
            ));
        }

        let mv = &self.movement;
        positive("movement.arrival_radius", mv.arrival_radius)?;
        positive("movement.stall_window", mv.stall_window)?;
        if mv.search_points == 0 {
            return Err(invalid("movement.search_points", "must be at least 1"));
        }

        if self.planner.max_depth == 0 {
            return Err(invalid("planner.max_depth", "must be at least 1"));
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("expected positive finite value, got {}", value)))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
