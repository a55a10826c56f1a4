//! Disposable - 멱등 해제 핸들

use parking_lot::Mutex;
use std::fmt;

type DisposeAction = Box<dyn FnOnce() + Send>;

/// 해제 핸들
///
/// `dispose()`는 최초 1회만 동작하며 이후 호출은 무시됩니다.
/// Drop 시 자동으로 해제되지 않습니다.
pub struct Disposable {
    action: Mutex<Option<DisposeAction>>,
}

impl Disposable {
    /// 해제 시 실행할 동작으로 생성
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// 아무 동작도 하지 않는 핸들 (이미 해제된 상태)
    pub fn none() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// 해제
    pub fn dispose(&self) {
        // 락을 놓은 뒤 실행 (동작 안에서 다른 핸들을 해제할 수 있음)
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }

    /// 해제 여부
    pub fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_dispose_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = {
            let count = count.clone();
            Disposable::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(!handle.is_disposed());
        handle.dispose();
        handle.dispose();
        assert!(handle.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_does_not_dispose() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            let _handle = Disposable::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(Disposable::none().is_disposed());
    }
}
