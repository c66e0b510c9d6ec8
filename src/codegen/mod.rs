// パス: src/codegen/mod.rs
// 役割: ネイティブ実行バックエンドのエラー型とエイリアスを定義し、実装を束ねる
// 意図: JIT 固有のエラーを評価器境界の EvalError へ写像する場所を一箇所にする
// 関連ファイル: src/codegen/jit.rs, src/evaluator.rs

pub mod jit;

use thiserror::Error;

use crate::errors::EvalError;

/// ネイティブコード生成で発生しうるエラー種別。
#[derive(Debug, Error)]
pub enum JitError {
    #[error("Cranelift module error: {0}")]
    Module(#[from] cranelift_module::ModuleError),
    #[error("Cranelift codegen error: {0}")]
    Codegen(#[from] cranelift_codegen::CodegenError),
    #[error("ネイティブバックエンドの初期化に失敗しました: {message}")]
    Setup { code: &'static str, message: String },
    #[error("コード生成中に未解決の名前が現れました: {0}")]
    Unresolved(String),
}

impl JitError {
    pub fn setup(code: &'static str, message: impl Into<String>) -> Self {
        Self::Setup {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            JitError::Module(_) => "JIT100",
            JitError::Codegen(_) => "JIT101",
            JitError::Setup { code, .. } => *code,
            JitError::Unresolved(_) => "JIT110",
        }
    }
}

/// ネイティブコード生成の結果を表す型。
pub type JitResult<T> = Result<T, JitError>;

impl From<JitError> for EvalError {
    fn from(err: JitError) -> Self {
        EvalError::new(err.code(), err.to_string())
    }
}
