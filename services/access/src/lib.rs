//! Client-side sync layer for the access-control backend
//!
//! Access history with infinite scroll, the card registry with its trash,
//! NFC and manual card enrollment, and the remote door open. Session,
//! gateway and cache live in the `auth` and `common` crates; this crate
//! composes them into the features a screen or command needs.

pub mod cards;
pub mod config;
pub mod door;
pub mod enrollment;
pub mod history;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod state;

pub use cards::{CardService, CardView, CardsController};
pub use config::AppConfig;
pub use door::{Confirm, DoorError, DoorOutcome, DoorStats, RemoteDoor};
pub use enrollment::{Enrollment, EnrollmentDraft, EnrollmentError};
pub use history::{AccessService, HistoryController, HistoryFilter};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use pagination::{ListController, Page, PageRequest, PageSource};
pub use state::AppState;
