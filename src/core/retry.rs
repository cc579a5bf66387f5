//! 重试台账
//!
//! 按动作键记录连续失败次数与最近原因，回答「这个动作还能不能再试」。
//! 达到上限即判为终态：计数封顶、只更新原因；成功或阶段切换时清账。
//! 每个需要重试记账的组件持有自己的一份台账，互不共享。

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{error, info, warn};

/// 单个动作键的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryRecord {
    pub attempts: u32,
    pub last_reason: String,
}

/// 重试台账
#[derive(Debug)]
pub struct RetryLedger {
    max_retries: u32,
    records: HashMap<String, RetryRecord>,
}

impl RetryLedger {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            records: HashMap::new(),
        }
    }

    /// 记录一次失败并给出裁决：true = 仍可重试，false = 已到上限。
    /// 终态之后计数不再增长，原因仍会更新。
    pub fn record_failure(&mut self, key: &str, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let record = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| RetryRecord {
                attempts: 0,
                last_reason: String::new(),
            });
        if record.attempts < self.max_retries {
            record.attempts += 1;
        }
        record.last_reason = reason;
        if record.attempts < self.max_retries {
            warn!(
                key,
                attempt = record.attempts,
                max = self.max_retries,
                reason = %record.last_reason,
                "action failed, will retry"
            );
            true
        } else {
            error!(
                key,
                attempts = record.attempts,
                reason = %record.last_reason,
                "action failed too many times, giving up"
            );
            false
        }
    }

    /// 成功后清账；此前有失败记录时输出一条恢复日志
    pub fn record_success(&mut self, key: &str) {
        if let Some(record) = self.records.remove(key) {
            if record.attempts > 0 {
                info!(key, attempts = record.attempts, "action recovered after retries");
            }
        }
    }

    pub fn reset(&mut self, key: &str) {
        self.records.remove(key);
    }

    /// 阶段切换时调用：上一阶段的失败历史对新阶段没有意义
    pub fn reset_all(&mut self) {
        if !self.records.is_empty() {
            info!(cleared = self.records.len(), "retry ledger cleared");
        }
        self.records.clear();
    }

    pub fn attempt_count(&self, key: &str) -> u32 {
        self.records.get(key).map(|r| r.attempts).unwrap_or(0)
    }

    pub fn is_retrying(&self, key: &str) -> bool {
        self.attempt_count(key) > 0
    }

    /// 状态快照（键序稳定，便于展示与断言）
    pub fn snapshot(&self) -> BTreeMap<String, RetryRecord> {
        self.records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// 人类可读的诊断摘要
    pub fn diagnostics(&self) -> String {
        if self.records.is_empty() {
            return "no errors".to_string();
        }
        self.snapshot()
            .iter()
            .map(|(key, record)| {
                format!("{}: {} attempts ({})", key, record.attempts, record.last_reason)
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_flips_to_terminal_at_max() {
        let mut ledger = RetryLedger::new(10);
        for attempt in 1..=9 {
            assert!(ledger.record_failure("talk", "no answer"), "attempt {}", attempt);
        }
        assert!(!ledger.record_failure("talk", "no answer"));
    }

    #[test]
    fn test_terminal_count_is_capped_and_reason_still_updates() {
        let mut ledger = RetryLedger::new(2);
        assert!(ledger.record_failure("walk", "first"));
        assert!(!ledger.record_failure("walk", "second"));
        assert!(!ledger.record_failure("walk", "third"));
        assert_eq!(ledger.attempt_count("walk"), 2);
        let snapshot = ledger.snapshot();
        assert_eq!(snapshot["walk"].last_reason, "third");
    }

    #[test]
    fn test_success_clears_the_record() {
        let mut ledger = RetryLedger::new(5);
        ledger.record_failure("open_door", "door stuck");
        assert!(ledger.is_retrying("open_door"));
        ledger.record_success("open_door");
        assert_eq!(ledger.attempt_count("open_door"), 0);
        assert!(!ledger.is_retrying("open_door"));
    }

    #[test]
    fn test_keys_are_tracked_independently() {
        let mut ledger = RetryLedger::new(3);
        ledger.record_failure("a", "x");
        ledger.record_failure("a", "x");
        ledger.record_failure("b", "y");
        assert_eq!(ledger.attempt_count("a"), 2);
        assert_eq!(ledger.attempt_count("b"), 1);
    }

    #[test]
    fn test_reset_all_clears_every_key() {
        let mut ledger = RetryLedger::new(3);
        ledger.record_failure("a", "x");
        ledger.record_failure("b", "y");
        ledger.reset_all();
        assert!(ledger.snapshot().is_empty());
        assert_eq!(ledger.diagnostics(), "no errors");
    }

    #[test]
    fn test_diagnostics_lists_keys_in_order() {
        let mut ledger = RetryLedger::new(3);
        ledger.record_failure("b_key", "later");
        ledger.record_failure("a_key", "earlier");
        let text = ledger.diagnostics();
        assert!(text.starts_with("a_key: 1 attempts (earlier)"));
        assert!(text.contains("b_key: 1 attempts (later)"));
    }

    #[test]
    fn test_zero_budget_is_terminal_immediately() {
        let mut ledger = RetryLedger::new(0);
        assert!(!ledger.record_failure("anything", "no budget"));
        assert_eq!(ledger.attempt_count("anything"), 0);
    }
}
