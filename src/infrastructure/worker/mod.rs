//! Worker Layer - Background Task Processing
//!
//! ReconcileWorker：生成结果的单写者队列

mod reconcile_worker;

pub use reconcile_worker::{ReconcileHandle, ReconcileWorker};
