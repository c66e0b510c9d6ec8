// パス: src/repl/printer.rs
// 役割: REPL のヘルプ・評価結果・プロトタイプ一覧の表示
// 意図: 表示形式を一箇所にまとめ、対話時とファイル読み込み時の出力を揃える
// 関連ファイル: src/repl/cmd.rs, src/evaluator.rs, src/prototype.rs
//! REPL で用いるヘルプメッセージと結果表示を集約したモジュール。

use std::io::{self, Write};

use crate::evaluator::Evaluation;
use crate::prototype::PrototypeDescriptor;

pub(crate) const BANNER: &str = "Kaleidoscope REPL (Rust) :: :help でヘルプ";

const HELP_TEXT: &str = concat!(
    "利用可能なコマンド:\n",
    "  :help              ヘルプ（本メッセージ）\n",
    "  :defs              定義済みのプロトタイプ一覧\n",
    "  :proto NAME        プロトタイプを JSON で表示\n",
    "  :load PATH         ファイルを 1 行ずつ読み込む\n",
    "  :quit              終了\n",
    "\n",
    "例:\n",
    "  ready> def add(a b)\n",
    "  ...>   a + b\n",
    "  ready> extern sqrt(x)\n",
    "  ready> sqrt(add(7, 9))      -- 4 を表示\n",
    "  ready> for i = 0, i < 3 in printd(i)\n",
);

pub(crate) fn render_help<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(HELP_TEXT.as_bytes())
}

/// 評価結果を 1 行で書き出す。
pub(crate) fn write_evaluation<W: Write>(out: &mut W, ev: &Evaluation) -> io::Result<()> {
    match ev {
        Evaluation::Defined { name, arity } => writeln!(out, "defined {}/{}", name, arity),
        Evaluation::Declared { name, arity } => writeln!(out, "extern {}/{}", name, arity),
        Evaluation::Value { value, .. } => writeln!(out, "{}", value),
    }
}

/// `:defs` 用の一覧。
pub(crate) fn write_prototypes<'a, W, I>(out: &mut W, protos: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a PrototypeDescriptor>,
{
    let mut any = false;
    for p in protos {
        any = true;
        let params: Vec<&str> = p.param_names().collect();
        writeln!(out, "  {}({})", p.name, params.join(" "))?;
    }
    if !any {
        writeln!(out, "(定義なし)")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{render_help, write_evaluation, write_prototypes};
    use crate::evaluator::Evaluation;
    use crate::prototype::PrototypeDescriptor;

    fn render(ev: &Evaluation) -> String {
        let mut buf = Vec::new();
        write_evaluation(&mut buf, ev).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn render_help_outputs_expected_text() {
        let mut buf = Vec::new();
        render_help(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), super::HELP_TEXT);
    }

    #[test]
    /// 評価結果の種類ごとの表示。
    fn evaluations_render_on_one_line() {
        let defined = Evaluation::Defined {
            name: "f".into(),
            arity: 2,
        };
        assert_eq!(render(&defined), "defined f/2\n");
        let declared = Evaluation::Declared {
            name: "sin".into(),
            arity: 1,
        };
        assert_eq!(render(&declared), "extern sin/1\n");
        let value = Evaluation::Value {
            name: "__anon_expr0".into(),
            value: 2.5,
        };
        assert_eq!(render(&value), "2.5\n");
    }

    #[test]
    fn empty_prototype_list() {
        let mut buf = Vec::new();
        write_prototypes(&mut buf, std::iter::empty::<&PrototypeDescriptor>()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "(定義なし)\n");
    }
}
