//! Event System - 동기 이벤트 발행/구독
//!
//! ## 아키텍처
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Emitter<T>                    │
//! │  fire(event) ──┬──────────────┬────────────┐   │
//! │                ▼              ▼            ▼   │
//! │          Listener 1     Listener N    broadcast│
//! │         (동기 호출)     (동기 호출)   receiver()│
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use decor_foundation::event::Emitter;
//!
//! let emitter = Arc::new(Emitter::<String>::new("changes"));
//! let subscription = emitter.subscribe(|msg| println!("{}", msg));
//! emitter.fire("hello".to_string());
//! subscription.dispose(); // 멱등
//! ```

pub mod disposable;
pub mod emitter;

pub use disposable::Disposable;
pub use emitter::{Emitter, Listener, ListenerId, DEFAULT_CHANNEL_CAPACITY};
