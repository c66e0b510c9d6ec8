// パス: src/naming.rs
// 役割: 名前の無いトップレベル式に一意な合成名を割り当てる系列を提供する
// 意図: プロセス全体の静的カウンタを使わず、所有可能な値として系列を持ち回る
// 関連ファイル: src/repl/driver.rs, src/config.rs
//! 匿名名の系列
//!
//! `begin(prefix)` を呼ぶたびに 0 から数え直す独立した走査を返す。カウンタは
//! 走査値そのものに閉じており、他の走査とは共有しない。系列は無限なので
//! `collect` せず、必要な数だけ `next_name` で取り出すこと。

/// 匿名式の名前に使う既定の接頭辞。先頭 `_` は識別子にならないため衝突しない。
pub const DEFAULT_ANON_PREFIX: &str = "__anon_expr";

/// `{prefix}0, {prefix}1, ...` を遅延生成する 1 回分の走査。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousNames {
    prefix: String,
    next: u64,
}

/// 新しい走査を開始する。
pub fn begin(prefix: impl Into<String>) -> AnonymousNames {
    AnonymousNames {
        prefix: prefix.into(),
        next: 0,
    }
}

impl AnonymousNames {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// これまでに取り出した名前の数。
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// 次の名前を取り出す。`u64` を使い切った場合のみ `None`。
    pub fn next_name(&mut self) -> Option<String> {
        let n = self.next;
        self.next = self.next.checked_add(1)?;
        Some(format!("{}{}", self.prefix, n))
    }
}

impl Iterator for AnonymousNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_name()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
