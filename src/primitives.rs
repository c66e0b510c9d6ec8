// パス: src/primitives.rs
// 役割: `extern` で宣言できるネイティブ関数の一覧を集約する
// 意図: インタプリタと JIT の双方が同じ実体・同じアリティを参照する
// 関連ファイル: src/evaluator.rs, src/codegen/jit.rs
//! プリミティブ定義モジュール
//!
//! - 実体は C ABI の関数として定義し、JIT からはシンボルとして、
//!   インタプリタからは関数ポインタとして呼び出す。
//! - `putchard` / `printd` は標準エラーへ出力し、常に `0.0` を返す。

use std::collections::HashMap;
use std::io::Write;

use once_cell::sync::Lazy;

/// ネイティブ関数の実体。引数はすべて `f64`。
#[derive(Clone, Copy, Debug)]
pub enum NativeFn {
    Unary(extern "C" fn(f64) -> f64),
    Binary(extern "C" fn(f64, f64) -> f64),
}

/// プリミティブ定義。
#[derive(Clone, Copy, Debug)]
pub struct Primitive {
    pub name: &'static str,
    pub func: NativeFn,
}

impl Primitive {
    pub fn arity(&self) -> usize {
        match self.func {
            NativeFn::Unary(_) => 1,
            NativeFn::Binary(_) => 2,
        }
    }

    /// JIT へ登録するシンボルアドレス。
    pub fn address(&self) -> *const u8 {
        match self.func {
            NativeFn::Unary(f) => f as *const u8,
            NativeFn::Binary(f) => f as *const u8,
        }
    }

    /// 引数の数が一致しない場合は `None`。
    pub fn call(&self, args: &[f64]) -> Option<f64> {
        match (self.func, args) {
            (NativeFn::Unary(f), [x]) => Some(f(*x)),
            (NativeFn::Binary(f), [x, y]) => Some(f(*x, *y)),
            _ => None,
        }
    }
}

extern "C" fn kl_sin(x: f64) -> f64 {
    x.sin()
}
extern "C" fn kl_cos(x: f64) -> f64 {
    x.cos()
}
extern "C" fn kl_sqrt(x: f64) -> f64 {
    x.sqrt()
}
extern "C" fn kl_exp(x: f64) -> f64 {
    x.exp()
}
extern "C" fn kl_log(x: f64) -> f64 {
    x.ln()
}
extern "C" fn kl_fabs(x: f64) -> f64 {
    x.abs()
}
extern "C" fn kl_pow(x: f64, y: f64) -> f64 {
    x.powf(y)
}
extern "C" fn kl_putchard(x: f64) -> f64 {
    let mut err = std::io::stderr();
    let _ = err.write_all(&[x as u8]);
    let _ = err.flush();
    0.0
}
extern "C" fn kl_printd(x: f64) -> f64 {
    eprintln!("{}", x);
    0.0
}

static PRIMITIVES: Lazy<HashMap<&'static str, Primitive>> = Lazy::new(|| {
    let defs = [
        ("sin", NativeFn::Unary(kl_sin)),
        ("cos", NativeFn::Unary(kl_cos)),
        ("sqrt", NativeFn::Unary(kl_sqrt)),
        ("exp", NativeFn::Unary(kl_exp)),
        ("log", NativeFn::Unary(kl_log)),
        ("fabs", NativeFn::Unary(kl_fabs)),
        ("pow", NativeFn::Binary(kl_pow)),
        ("putchard", NativeFn::Unary(kl_putchard)),
        ("printd", NativeFn::Unary(kl_printd)),
    ];
    defs.into_iter()
        .map(|(name, func)| (name, Primitive { name, func }))
        .collect()
});

/// 名前からプリミティブを検索する。
pub fn lookup(name: &str) -> Option<Primitive> {
    PRIMITIVES.get(name).copied()
}

/// 登録済みプリミティブを名前順に列挙する。
pub fn all() -> Vec<Primitive> {
    let mut prims: Vec<Primitive> = PRIMITIVES.values().copied().collect();
    prims.sort_by_key(|p| p.name);
    prims
}
