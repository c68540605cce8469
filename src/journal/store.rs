//! 追加写入的访问日志文件
//!
//! 每行一个 JSON 对象。写入只追加不覆盖；读取时无法解析的行被跳过。

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::VisitEntry;
use crate::errors::{Result, VisitLogError};

/// 扫描单行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScanItem {
    Entry(VisitEntry),
    /// 损坏或不完整的行（1-based 行号）
    Skipped { line: usize, reason: String },
}

/// 访问日志
pub struct VisitJournal {
    path: PathBuf,
    sync_on_append: bool,
    /// 单写者：同一时刻只有一个线程在追加
    append_lock: Mutex<()>,
}

impl VisitJournal {
    pub fn new(path: impl Into<PathBuf>, sync_on_append: bool) -> Self {
        Self {
            path: path.into(),
            sync_on_append,
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录
    ///
    /// I/O 错误直接返回给调用方，不重试
    pub fn append(&self, entry: &VisitEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.append_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                error!("Failed to open journal {}: {}", self.path.display(), e);
                VisitLogError::file_operation(format!(
                    "Failed to open journal {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        // 上次写入中断留下的残行没有换行符，先补一个，避免新记录被拼接进去
        if ends_with_torn_line(&mut file)? {
            debug!("Journal {} ends with a torn line, terminating it", self.path.display());
            line.insert(0, b'\n');
        }

        file.write_all(&line).map_err(|e| {
            error!("Failed to append to journal {}: {}", self.path.display(), e);
            VisitLogError::file_operation(format!("Failed to append to journal: {}", e))
        })?;

        if self.sync_on_append {
            file.sync_data()?;
        }

        trace!("Journal append: {} {} {}", entry.ip, entry.method, entry.path);
        Ok(())
    }

    /// 从头到尾逐行扫描
    ///
    /// 文件不存在时返回空扫描；空行直接忽略
    pub fn scan(&self) -> Result<JournalScan> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Journal {} does not exist yet", self.path.display());
                None
            }
            Err(e) => {
                return Err(VisitLogError::file_operation(format!(
                    "Failed to open journal {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        Ok(JournalScan {
            reader,
            line_no: 0,
            buf: Vec::new(),
        })
    }

    /// 所有可解析的记录，按写入顺序
    pub fn entries(&self) -> Result<impl Iterator<Item = Result<VisitEntry>>> {
        Ok(self.scan()?.filter_map(|item| match item {
            Ok(ScanItem::Entry(entry)) => Some(Ok(entry)),
            Ok(ScanItem::Skipped { .. }) => None,
            Err(e) => Some(Err(e)),
        }))
    }

    /// 最近的 `n` 条有效记录，保持原始顺序
    pub fn tail(&self, n: usize) -> Result<Vec<VisitEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut window: VecDeque<VisitEntry> = VecDeque::with_capacity(n.min(4096));
        let mut skipped = 0usize;

        for item in self.scan()? {
            match item? {
                ScanItem::Entry(entry) => {
                    if window.len() == n {
                        window.pop_front();
                    }
                    window.push_back(entry);
                }
                ScanItem::Skipped { line, reason } => {
                    trace!("Skipping journal line {}: {}", line, reason);
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            debug!(
                "Journal tail({}): skipped {} unparseable line(s) in {}",
                n,
                skipped,
                self.path.display()
            );
        }

        Ok(window.into())
    }
}

/// 文件非空且最后一个字节不是换行符
fn ends_with_torn_line(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// 惰性的逐行扫描器
pub struct JournalScan {
    reader: Option<BufReader<File>>,
    line_no: usize,
    buf: Vec<u8>,
}

impl Iterator for JournalScan {
    type Item = Result<ScanItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;

        loop {
            self.buf.clear();
            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.buf.trim_ascii();
                    if line.is_empty() {
                        continue;
                    }
                    return Some(Ok(match serde_json::from_slice::<VisitEntry>(line) {
                        Ok(entry) => ScanItem::Entry(entry),
                        Err(e) => ScanItem::Skipped {
                            line: self.line_no,
                            reason: e.to_string(),
                        },
                    }));
                }
                Err(e) => {
                    self.reader = None;
                    return Some(Err(VisitLogError::file_operation(format!(
                        "Failed to read journal: {}",
                        e
                    ))));
                }
            }
        }
    }
}
