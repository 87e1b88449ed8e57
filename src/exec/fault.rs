// src/exec/fault.rs

//! Run-scoped "first fault wins" slot.

use std::fmt;
use std::sync::Mutex;

/// A fault raised while a chain was executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFault {
    pub chain: usize,
    /// Type of the operator that raised the fault, if one was running.
    pub op_type: Option<String>,
    pub message: String,
}

impl fmt::Display for RunFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain {}: {}", self.chain, self.message)?;
        if let Some(op) = &self.op_type {
            write!(f, " (op {op})")?;
        }
        Ok(())
    }
}

/// Holds the first fault recorded during a run.
///
/// Written rarely (only on faults) and read once after the run, so a plain
/// mutex is enough.
#[derive(Debug, Default)]
pub struct FaultSlot {
    first: Mutex<Option<RunFault>>,
}

impl FaultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fault` unless a fault was already captured this run.
    ///
    /// Returns `true` if this call stored it.
    pub fn store(&self, fault: RunFault) -> bool {
        let mut slot = self.first.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            return false;
        }
        *slot = Some(fault);
        true
    }

    pub fn get(&self) -> Option<RunFault> {
        self.first
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        *self.first.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

/// Render a caught panic payload as text.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "failed to execute task: unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn fault(chain: usize) -> RunFault {
        RunFault {
            chain,
            op_type: None,
            message: format!("fault {chain}"),
        }
    }

    #[test]
    fn keeps_only_the_first_fault() {
        let slot = FaultSlot::new();
        assert!(slot.store(fault(1)));
        assert!(!slot.store(fault(2)));
        assert_eq!(slot.get().map(|f| f.chain), Some(1));

        slot.clear();
        assert!(slot.get().is_none());
    }

    #[test]
    fn exactly_one_concurrent_writer_wins() {
        let slot = Arc::new(FaultSlot::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || slot.store(fault(i)))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert!(slot.get().is_some());
    }

    #[test]
    fn display_includes_op_type() {
        let f = RunFault {
            chain: 3,
            op_type: Some("Conv".into()),
            message: "bad shape".into(),
        };
        assert_eq!(f.to_string(), "chain 3: bad shape (op Conv)");
    }
}
