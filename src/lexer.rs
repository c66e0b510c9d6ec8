// パス: src/lexer.rs
// 役割: Kaleidoscope ソースを位置付きトークン列へ変換する字句解析器
// 意図: 構文解析と診断が共有する SourceSpan をすべてのトークンに付与する
// 関連ファイル: src/parser/mod.rs, src/span.rs, src/errors.rs
//! 字句解析モジュール
//!
//! - 値はすべて `f64` なので数値リテラルは 1 種類のみ。
//! - 識別子は英字で始まる英数字列。先頭 `_` は識別子にならないため、
//!   `__` で始まる名前は利用者が宣言できない（匿名式の予約接頭辞に使う）。
//! - `#` から行末まではコメント。改行は空白として扱う。

use crate::errors::LexerError;
use crate::span::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
/// 生成されたトークンとその位置情報を保持するレコード。
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// 字句解析で識別されるトークンの分類。
pub enum TokenKind {
    EOF,
    // キーワード
    DEF,
    EXTERN,
    IF,
    THEN,
    ELSE,
    FOR,
    IN,
    // 値
    IDENT,
    NUMBER,
    // 演算子・記号
    PLUS,
    MINUS,
    STAR,
    SLASH,
    LT,
    GT,
    LPAREN,
    RPAREN,
    COMMA,
    SEMI,
    EQUAL,
}

impl TokenKind {
    /// 診断メッセージ用の表記。
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::EOF => "入力の終端",
            TokenKind::DEF => "'def'",
            TokenKind::EXTERN => "'extern'",
            TokenKind::IF => "'if'",
            TokenKind::THEN => "'then'",
            TokenKind::ELSE => "'else'",
            TokenKind::FOR => "'for'",
            TokenKind::IN => "'in'",
            TokenKind::IDENT => "識別子",
            TokenKind::NUMBER => "数値",
            TokenKind::PLUS => "'+'",
            TokenKind::MINUS => "'-'",
            TokenKind::STAR => "'*'",
            TokenKind::SLASH => "'/'",
            TokenKind::LT => "'<'",
            TokenKind::GT => "'>'",
            TokenKind::LPAREN => "'('",
            TokenKind::RPAREN => "')'",
            TokenKind::COMMA => "','",
            TokenKind::SEMI => "';'",
            TokenKind::EQUAL => "'='",
        }
    }
}

#[derive(Debug)]
/// 行頭オフセットを事前計算し、行・列情報を素早く算出するヘルパ。
struct LineMap {
    starts: Vec<usize>,
}

impl LineMap {
    fn new(src: &str) -> Self {
        let mut starts = vec![0];
        for (idx, ch) in src.char_indices() {
            if ch == '\n' {
                starts.push(idx + 1);
            }
        }
        Self { starts }
    }

    /// 指定バイト位置の行番号と桁位置を返す。
    fn locate(&self, src: &str, pos: usize) -> (usize, usize) {
        let idx = match self.starts.binary_search(&pos) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let start = self.starts[idx];
        let col = src[start..pos].chars().count() + 1;
        (idx + 1, col)
    }

    /// 指定行に対応するテキスト断片を返す（改行は除去する）。
    fn line_text<'a>(&self, src: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.starts.get(i)) else {
            return "";
        };
        let end = self.starts.get(line).copied().unwrap_or(src.len());
        let slice = &src[start..end];
        slice.strip_suffix('\n').unwrap_or(slice)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

struct Lexer<'a> {
    src: &'a str,
    cursor: usize,
    line_map: LineMap,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            cursor: 0,
            line_map: LineMap::new(src),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexerError> {
        loop {
            self.consume_trivia();
            let Some(ch) = self.peek_char() else {
                break;
            };
            self.lex_token(ch)?;
        }
        let end = self.src.len();
        self.push(TokenKind::EOF, end, end);
        Ok(self.tokens)
    }

    fn consume_trivia(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.advance_char();
            } else if ch == '#' {
                while let Some(c) = self.advance_char() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn lex_token(&mut self, ch: char) -> Result<(), LexerError> {
        let start = self.cursor;
        let symbol = match ch {
            '+' => Some(TokenKind::PLUS),
            '-' => Some(TokenKind::MINUS),
            '*' => Some(TokenKind::STAR),
            '/' => Some(TokenKind::SLASH),
            '<' => Some(TokenKind::LT),
            '>' => Some(TokenKind::GT),
            '(' => Some(TokenKind::LPAREN),
            ')' => Some(TokenKind::RPAREN),
            ',' => Some(TokenKind::COMMA),
            ';' => Some(TokenKind::SEMI),
            '=' => Some(TokenKind::EQUAL),
            _ => None,
        };
        if let Some(kind) = symbol {
            self.advance_char();
            self.push(kind, start, self.cursor);
            return Ok(());
        }
        if ch.is_ascii_digit() {
            return self.lex_number();
        }
        if ch.is_ascii_alphabetic() {
            self.lex_identifier_or_keyword();
            return Ok(());
        }
        self.advance_char();
        Err(self.err(
            "LEX090",
            format!("解釈できない文字です: {:?}", ch),
            start,
            self.cursor,
        ))
    }

    fn lex_number(&mut self) -> Result<(), LexerError> {
        let start = self.cursor;
        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance_char();
            if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err(
                    "LEX010",
                    "小数点の後に数字がありません",
                    start,
                    self.cursor,
                ));
            }
            self.skip_digits();
        }
        self.push(TokenKind::NUMBER, start, self.cursor);
        Ok(())
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance_char();
        }
    }

    fn lex_identifier_or_keyword(&mut self) {
        let start = self.cursor;
        while self.peek_char().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.advance_char();
        }
        let kind = match &self.src[start..self.cursor] {
            "def" => TokenKind::DEF,
            "extern" => TokenKind::EXTERN,
            "if" => TokenKind::IF,
            "then" => TokenKind::THEN,
            "else" => TokenKind::ELSE,
            "for" => TokenKind::FOR,
            "in" => TokenKind::IN,
            _ => TokenKind::IDENT,
        };
        self.push(kind, start, self.cursor);
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new(
            start,
            end,
            self.line_map.locate(self.src, start),
            self.line_map.locate(self.src, end),
        )
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let span = self.span(start, end);
        self.tokens.push(Token {
            kind,
            value: self.src[start..end].into(),
            span,
        });
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.cursor..].chars().next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }

    fn err(
        &self,
        code: &'static str,
        message: impl Into<String>,
        start: usize,
        end: usize,
    ) -> LexerError {
        let span = self.span(start, end);
        let snippet = self.line_map.line_text(self.src, span.start_line).to_string();
        LexerError(crate::errors::ErrorInfo::at(code, message, span).with_snippet(snippet))
    }
}

/// ソース全体をトークン列に変換する。末尾には必ず `EOF` が付く。
pub fn lex(src: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(src).run()
}

#[cfg(test)]
mod tests {
    use super::{lex, TokenKind};

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    /// キーワード・識別子・記号の分類を確認する。
    fn classifies_keywords_and_symbols() {
        use TokenKind::*;
        assert_eq!(
            kinds("def foo(a b) a+b*2"),
            vec![DEF, IDENT, LPAREN, IDENT, IDENT, RPAREN, IDENT, PLUS, IDENT, STAR, NUMBER, EOF]
        );
        assert_eq!(
            kinds("for i = 1, i < 3 in x; extern"),
            vec![FOR, IDENT, EQUAL, NUMBER, COMMA, IDENT, LT, NUMBER, IN, IDENT, SEMI, EXTERN, EOF]
        );
    }

    #[test]
    /// コメントと改行が空白として読み飛ばされることを確認する。
    fn skips_comments_and_newlines() {
        use TokenKind::*;
        assert_eq!(kinds("# note\n1 # tail\n\n+ 2"), vec![NUMBER, PLUS, NUMBER, EOF]);
        assert_eq!(kinds("   \n\t"), vec![EOF]);
    }

    #[test]
    /// 複数行入力でも各トークンの行・列が正しく付与される。
    fn spans_track_lines_and_columns() {
        let ts = lex("def foo(a b)\n  a").unwrap();
        let foo = &ts[1];
        assert_eq!(foo.value, "foo");
        assert_eq!((foo.span.start_line, foo.span.start_col), (1, 5));
        assert_eq!(foo.span.end_col, 8);
        let last = &ts[6];
        assert_eq!(last.value, "a");
        assert_eq!((last.span.start_line, last.span.start_col), (2, 3));
        assert_eq!(last.span.start, 15);
    }

    #[test]
    /// 未知の文字や不正な小数はスニペット付きのエラーになる。
    fn reports_unknown_char_and_bad_number() {
        let err = lex("1 + @").unwrap_err();
        assert_eq!(err.0.code, "LEX090");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[LEX090]"));
        assert!(rendered.contains("@line=1,col=5"));
        assert!(rendered.ends_with("1 + @\n    ^"));

        let err = lex("3.").unwrap_err();
        assert_eq!(err.0.code, "LEX010");
    }

    #[test]
    /// 先頭のアンダースコアは識別子として受理されない。
    fn leading_underscore_is_rejected() {
        assert!(lex("__anon_expr0").is_err());
        assert!(lex("x_1").is_err());
        assert_eq!(kinds("x1"), vec![TokenKind::IDENT, TokenKind::EOF]);
    }
}
