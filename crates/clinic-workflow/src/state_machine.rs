//! 预约状态机
//!
//! 管理预约的生命周期状态转换：BOOKED 可转向 COMPLETED 或 CANCELLED，
//! 两个终态不再接受任何事件。

use clinic_core::{AppointmentStatus, ClinicError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 预约状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentEvent {
    Complete,
    Cancel,
}

/// 预约状态机
#[derive(Debug)]
pub struct AppointmentStateMachine {
    transitions: HashMap<(AppointmentStatus, AppointmentEvent), AppointmentStatus>,
}

impl AppointmentStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert(
            (AppointmentStatus::Booked, AppointmentEvent::Complete),
            AppointmentStatus::Completed,
        );
        transitions.insert(
            (AppointmentStatus::Booked, AppointmentEvent::Cancel),
            AppointmentStatus::Cancelled,
        );

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: AppointmentStatus, event: AppointmentEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(
        &self,
        from: AppointmentStatus,
        event: AppointmentEvent,
    ) -> Result<AppointmentStatus> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(ClinicError::State(format!(
                "cannot apply {:?} to appointment in status {}",
                event,
                from.as_str()
            ))),
        }
    }

    /// 获取状态的所有可能事件
    pub fn possible_events(&self, current: AppointmentStatus) -> Vec<AppointmentEvent> {
        self.transitions
            .keys()
            .filter(|(state, _)| *state == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for AppointmentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = AppointmentStateMachine::new();

        // 测试有效转换
        assert!(sm.can_transition(AppointmentStatus::Booked, AppointmentEvent::Complete));
        assert!(sm.can_transition(AppointmentStatus::Booked, AppointmentEvent::Cancel));
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let sm = AppointmentStateMachine::new();

        // 终态不接受任何事件
        assert!(!sm.can_transition(AppointmentStatus::Completed, AppointmentEvent::Cancel));
        assert!(!sm.can_transition(AppointmentStatus::Completed, AppointmentEvent::Complete));
        assert!(!sm.can_transition(AppointmentStatus::Cancelled, AppointmentEvent::Complete));
        assert!(!sm.can_transition(AppointmentStatus::Cancelled, AppointmentEvent::Cancel));
    }

    #[test]
    fn test_transition_execution() {
        let sm = AppointmentStateMachine::new();

        let next = sm
            .transition(AppointmentStatus::Booked, AppointmentEvent::Complete)
            .unwrap();
        assert_eq!(next, AppointmentStatus::Completed);

        let next = sm
            .transition(AppointmentStatus::Booked, AppointmentEvent::Cancel)
            .unwrap();
        assert_eq!(next, AppointmentStatus::Cancelled);

        let result = sm.transition(AppointmentStatus::Cancelled, AppointmentEvent::Complete);
        assert!(matches!(result, Err(ClinicError::State(_))));
    }
}
