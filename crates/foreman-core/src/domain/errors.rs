//! Errors - エラーの運用分類
//!
//! エンジン内部に「致命的」な経路は無い。ワーカーはどの分類でも
//! 固定 backoff の後にやり直す。分類はログのレベルと呼び出し側の判断に使う。

use serde::{Deserialize, Serialize};

/// ErrorKind は実行エラーの分類
///
/// - Transient: タイムアウト、接続不可、「タスクなし」（リトライで解決する）
/// - Decode: リモート応答の形式エラー（ワーカーでは Transient と同じ扱い）
/// - Invariant: 存在しない id への mark_done など。Store は変更されない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Decode,
    Invariant,
}
