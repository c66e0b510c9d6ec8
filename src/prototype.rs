// パス: src/prototype.rs
// 役割: 解析済みの呼び出し可能定義から名前と位置付き仮引数列を取り出す
// 意図: 下流のコード生成が位置引数束縛に使うメタデータを順序どおりに提供する
// 関連ファイル: src/ast.rs, src/repl/driver.rs, src/codegen/jit.rs
//! プロトタイプ抽出
//!
//! 識別子列の先頭が関数名、残りが宣言順の仮引数。呼び出し側の引数は位置で
//! 束縛されるため、並べ替えや欠落は表示上の問題ではなく誤りになる。

use serde::Serialize;

use crate::ast::PrototypeNode;
use crate::errors::InternalError;
use crate::span::SourceSpan;

/// 仮引数 1 つ分の名前と位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub span: SourceSpan,
}

/// 呼び出し可能定義の頭部。`name` は空でない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrototypeDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
}

impl PrototypeDescriptor {
    /// 引数を取らない合成プロトタイプ（匿名式の包み込み用）。
    pub fn nullary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }
}

/// 完全に解析された定義ノードからプロトタイプを抽出する。
///
/// 識別子が 1 つも無いノードは文法側の契約違反なので `InternalError` を返す。
pub fn extract(node: &PrototypeNode) -> Result<PrototypeDescriptor, InternalError> {
    let mut idents = node.idents.iter();
    let name = idents.next().ok_or(InternalError::EmptyPrototype)?;
    let parameters = idents
        .map(|ident| ParameterDescriptor {
            name: ident.text.clone(),
            span: ident.span,
        })
        .collect();
    Ok(PrototypeDescriptor {
        name: name.text.clone(),
        parameters,
    })
}
