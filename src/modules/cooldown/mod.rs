use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// 一次获取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Accepted,
    Rejected { remaining: Duration },
}

impl CooldownDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CooldownDecision::Accepted)
    }

    /// 剩余等待秒数（向上取整）
    pub fn remaining_secs(&self) -> i64 {
        match self {
            CooldownDecision::Accepted => 0,
            CooldownDecision::Rejected { remaining } => {
                let millis = remaining.num_milliseconds();
                (millis + 999) / 1000
            }
        }
    }
}

/// 同一动作在冷却窗口内只接受一次；拒绝立即返回，不排队
#[derive(Debug)]
pub struct CooldownGate {
    window: Duration,
    last_trigger: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_trigger: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 检查并记录，整个过程在同一把锁内完成
    pub fn try_acquire(&self, action: &str, now: DateTime<Utc>) -> CooldownDecision {
        let mut guard = self.last_trigger.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(last) = guard.get(action) {
            let elapsed = now - *last;
            if elapsed < self.window {
                // 时钟回拨时剩余时间不超过一个窗口
                let remaining = (self.window - elapsed).min(self.window);
                tracing::debug!(
                    "动作 {} 冷却中, 剩余 {} ms",
                    action,
                    remaining.num_milliseconds()
                );
                return CooldownDecision::Rejected { remaining };
            }
        }

        guard.insert(action.to_string(), now);
        CooldownDecision::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    #[test]
    fn first_call_is_accepted_and_repeat_is_rejected() {
        let gate = CooldownGate::new(Duration::seconds(5));
        let t0 = Utc::now();

        assert!(gate.try_acquire("clean:temp", t0).is_accepted());

        let decision = gate.try_acquire("clean:temp", t0 + Duration::seconds(2));
        assert_eq!(
            decision,
            CooldownDecision::Rejected {
                remaining: Duration::seconds(3)
            }
        );
        assert_eq!(decision.remaining_secs(), 3);
    }

    #[test]
    fn window_boundary_accepts_again() {
        let gate = CooldownGate::new(Duration::seconds(5));
        let t0 = Utc::now();

        assert!(gate.try_acquire("a", t0).is_accepted());
        assert!(!gate.try_acquire("a", t0 + Duration::milliseconds(4999)).is_accepted());
        assert!(gate.try_acquire("a", t0 + Duration::seconds(5)).is_accepted());
        // 新的窗口从第二次接受开始计算
        assert!(!gate.try_acquire("a", t0 + Duration::seconds(6)).is_accepted());
    }

    #[test]
    fn different_actions_do_not_share_a_window() {
        let gate = CooldownGate::new(Duration::seconds(5));
        let t0 = Utc::now();

        assert!(gate.try_acquire("clean:temp", t0).is_accepted());
        assert!(gate.try_acquire("clean:dns", t0).is_accepted());
    }

    #[test]
    fn clock_going_backwards_stays_on_cooldown() {
        let gate = CooldownGate::new(Duration::seconds(5));
        let t0 = Utc::now();

        assert!(gate.try_acquire("a", t0).is_accepted());
        let decision = gate.try_acquire("a", t0 - Duration::seconds(10));
        assert_eq!(
            decision,
            CooldownDecision::Rejected {
                remaining: Duration::seconds(5)
            }
        );
    }

    #[test]
    fn concurrent_callers_at_same_instant_get_exactly_one_acceptance() {
        let gate = Arc::new(CooldownGate::new(Duration::seconds(30)));
        let t0 = Utc::now();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    gate.try_acquire("clean:temp", t0)
                })
            })
            .collect();

        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let accepted = decisions.iter().filter(|d| d.is_accepted()).count();
        assert_eq!(accepted, 1);

        for decision in decisions.iter().filter(|d| !d.is_accepted()) {
            assert!(decision.remaining_secs() > 0);
        }
    }
}
