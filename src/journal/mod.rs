//! 访问日志模块
//!
//! - `VisitEntry`: 单条访问记录
//! - `VisitJournal`: 追加写入的 JSON Lines 文件，支持尾部读取与全量扫描

mod entry;
mod store;

pub use entry::{VisitEntry, current_timestamp};
pub use store::{JournalScan, ScanItem, VisitJournal};
