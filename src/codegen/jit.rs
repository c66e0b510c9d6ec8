// パス: src/codegen/jit.rs
// 役割: 名前付き入力単位を Cranelift でネイティブ関数へ変換し、その場で実行する
// 意図: 長寿命の REPL セッションで定義を蓄積し、匿名式を一意な名前の関数として評価する
// 関連ファイル: src/codegen/mod.rs, src/evaluator.rs, src/primitives.rs
//! JIT 評価器
//!
//! - すべての関数は `f64` を受け取り `f64` を返す。
//! - 匿名式は引数なし関数として定義し、確定直後に呼び出す。
//! - 同じモジュール内で同名の関数を 2 度定義できないため、匿名式の名前は
//!   セッション中で重複してはならない。
//! - 未定義参照とアリティ不一致はコード生成前に検出する。生成後に未解決
//!   シンボルが残るとモジュール確定時に失敗するため。

use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::FloatCC;
use cranelift_codegen::ir::{
    types, AbiParam, Function as ClifFunction, InstBuilder, Signature, UserFuncName, Value,
};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext, Variable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module};
use tracing::debug;

use crate::ast::{BinOp, Expr};
use crate::codegen::{JitError, JitResult};
use crate::errors::EvalError;
use crate::evaluator::{
    already_bound, check_references, resolve_extern, Evaluation, Evaluator, NamedUnit, UnitBody,
};
use crate::primitives;

#[derive(Clone, Copy, Debug)]
struct Declared {
    id: FuncId,
    arity: usize,
}

pub struct JitEvaluator {
    module: JITModule,
    builder_ctx: FunctionBuilderContext,
    functions: HashMap<String, Declared>,
}

impl JitEvaluator {
    /// ホスト ISA 向けの JIT モジュールを構築し、プリミティブをシンボル登録する。
    pub fn new() -> JitResult<Self> {
        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .map_err(|e| JitError::setup("JIT001", format!("設定エラー: {e}")))?;
        flag_builder
            .set("is_pic", "false")
            .map_err(|e| JitError::setup("JIT001", format!("設定エラー: {e}")))?;
        let isa_builder = cranelift_native::builder().map_err(|e| {
            JitError::setup(
                "JIT002",
                format!("ホスト ISA サポートの初期化に失敗しました: {e}"),
            )
        })?;
        let isa = isa_builder.finish(settings::Flags::new(flag_builder))?;

        let mut builder = JITBuilder::with_isa(isa, cranelift_module::default_libcall_names());
        for prim in primitives::all() {
            builder.symbol(prim.name, prim.address());
        }
        Ok(Self {
            module: JITModule::new(builder),
            builder_ctx: FunctionBuilderContext::new(),
            functions: HashMap::new(),
        })
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn signature(&self, arity: usize) -> Signature {
        let mut sig = self.module.make_signature();
        for _ in 0..arity {
            sig.params.push(AbiParam::new(types::F64));
        }
        sig.returns.push(AbiParam::new(types::F64));
        sig
    }

    fn declare_extern(&mut self, unit: &NamedUnit) -> Result<Evaluation, EvalError> {
        let prim = resolve_extern(&unit.prototype)?;
        let sig = self.signature(prim.arity());
        let id = self
            .module
            .declare_function(prim.name, Linkage::Import, &sig)
            .map_err(JitError::from)?;
        self.functions.insert(
            prim.name.to_string(),
            Declared {
                id,
                arity: prim.arity(),
            },
        );
        Ok(Evaluation::Declared {
            name: prim.name.to_string(),
            arity: prim.arity(),
        })
    }

    /// 関数を生成・定義し、モジュールを確定する。
    fn compile(&mut self, unit: &NamedUnit, body: &Expr) -> JitResult<FuncId> {
        let proto = &unit.prototype;
        let sig = self.signature(proto.arity());
        let id = self
            .module
            .declare_function(&proto.name, Linkage::Export, &sig)?;

        let mut ctx = self.module.make_context();
        ctx.func =
            ClifFunction::with_name_signature(UserFuncName::testcase(proto.name.as_str()), sig);

        let lowered = {
            let mut builder = FunctionBuilder::new(&mut ctx.func, &mut self.builder_ctx);
            let entry = builder.create_block();
            builder.append_block_params_for_function_params(entry);
            builder.switch_to_block(entry);
            builder.seal_block(entry);

            let mut lw = Lowerer {
                module: &mut self.module,
                functions: &self.functions,
                current: (proto.name.as_str(), id),
                builder,
                scope: HashMap::new(),
                next_var: 0,
            };
            for (idx, param) in proto.param_names().enumerate() {
                let var = lw.fresh_var();
                let value = lw.builder.block_params(entry)[idx];
                lw.builder.def_var(var, value);
                lw.scope.insert(param.to_string(), var);
            }
            match lw.lower(body) {
                Ok(result) => {
                    lw.builder.ins().return_(&[result]);
                    lw.builder.finalize();
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };
        if let Err(err) = lowered {
            // 途中で止まったビルダー文脈は再利用できない
            self.builder_ctx = FunctionBuilderContext::new();
            self.module.clear_context(&mut ctx);
            return Err(err);
        }

        let defined = self.module.define_function(id, &mut ctx);
        self.module.clear_context(&mut ctx);
        defined?;
        self.module.finalize_definitions()?;
        debug!(name = %proto.name, arity = proto.arity(), "jit function finalized");
        Ok(id)
    }
}

impl Evaluator for JitEvaluator {
    fn bind_and_evaluate(&mut self, unit: &NamedUnit) -> Result<Evaluation, EvalError> {
        let name = unit.name().to_string();
        if self.is_bound(&name) {
            return Err(already_bound(&name));
        }
        let body = match &unit.body {
            UnitBody::Extern => return self.declare_extern(unit),
            UnitBody::Function(body) => body,
        };
        check_references(unit, &|n| self.functions.get(n).map(|d| d.arity))?;
        let id = self.compile(unit, body)?;
        let arity = unit.prototype.arity();
        self.functions.insert(name.clone(), Declared { id, arity });
        if !unit.anonymous {
            return Ok(Evaluation::Defined { name, arity });
        }
        let code = self.module.get_finalized_function(id);
        // SAFETY: 直前に「引数なし・f64 を返す」シグネチャで定義し確定した関数を指している
        let func = unsafe { std::mem::transmute::<*const u8, extern "C" fn() -> f64>(code) };
        Ok(Evaluation::Value {
            name,
            value: func(),
        })
    }
}

/// 1 関数分の式を Cranelift IR へ落とす作業状態。
struct Lowerer<'a, 'f> {
    module: &'a mut JITModule,
    functions: &'a HashMap<String, Declared>,
    current: (&'a str, FuncId),
    builder: FunctionBuilder<'f>,
    scope: HashMap<String, Variable>,
    next_var: u32,
}

impl<'a, 'f> Lowerer<'a, 'f> {
    fn fresh_var(&mut self) -> Variable {
        let var = Variable::from_u32(self.next_var);
        self.next_var += 1;
        self.builder.declare_var(var, types::F64);
        var
    }

    fn callee(&self, name: &str) -> Option<FuncId> {
        let (current, id) = self.current;
        if name == current {
            return Some(id);
        }
        self.functions.get(name).map(|d| d.id)
    }

    fn lower(&mut self, expr: &Expr) -> JitResult<Value> {
        match expr {
            Expr::Number { value, .. } => Ok(self.builder.ins().f64const(*value)),
            Expr::Variable { name, .. } => {
                let var = *self
                    .scope
                    .get(name)
                    .ok_or_else(|| JitError::Unresolved(name.clone()))?;
                Ok(self.builder.use_var(var))
            }
            Expr::Binary { op, left, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                Ok(self.binop(*op, l, r))
            }
            Expr::Call { callee, args } => {
                let id = self
                    .callee(&callee.text)
                    .ok_or_else(|| JitError::Unresolved(callee.text.clone()))?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.lower(arg)?);
                }
                let func_ref = self.module.declare_func_in_func(id, self.builder.func);
                let call = self.builder.ins().call(func_ref, &values);
                Ok(self.builder.inst_results(call)[0])
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(cond, then_branch, else_branch),
            Expr::For {
                var,
                start,
                end,
                step,
                body,
            } => self.lower_for(&var.text, start, end, step.as_deref(), body),
        }
    }

    fn binop(&mut self, op: BinOp, l: Value, r: Value) -> Value {
        match op {
            BinOp::Add => self.builder.ins().fadd(l, r),
            BinOp::Sub => self.builder.ins().fsub(l, r),
            BinOp::Mul => self.builder.ins().fmul(l, r),
            BinOp::Div => self.builder.ins().fdiv(l, r),
            BinOp::Lt => self.compare(FloatCC::LessThan, l, r),
            BinOp::Gt => self.compare(FloatCC::GreaterThan, l, r),
        }
    }

    /// 比較結果を 1.0 / 0.0 の f64 として返す。
    fn compare(&mut self, cc: FloatCC, l: Value, r: Value) -> Value {
        let cmp = self.builder.ins().fcmp(cc, l, r);
        let one = self.builder.ins().f64const(1.0);
        let zero = self.builder.ins().f64const(0.0);
        self.builder.ins().select(cmp, one, zero)
    }

    fn is_true(&mut self, v: Value) -> Value {
        let zero = self.builder.ins().f64const(0.0);
        self.builder.ins().fcmp(FloatCC::NotEqual, v, zero)
    }

    fn lower_if(&mut self, cond: &Expr, then_expr: &Expr, else_expr: &Expr) -> JitResult<Value> {
        let c = self.lower(cond)?;
        let c = self.is_true(c);

        let then_block = self.builder.create_block();
        let else_block = self.builder.create_block();
        let merge_block = self.builder.create_block();
        let merged = self.builder.append_block_param(merge_block, types::F64);

        self.builder
            .ins()
            .brif(c, then_block, &[], else_block, &[]);
        self.builder.seal_block(then_block);
        self.builder.seal_block(else_block);

        self.builder.switch_to_block(then_block);
        let then_value = self.lower(then_expr)?;
        self.builder.ins().jump(merge_block, &[then_value]);

        self.builder.switch_to_block(else_block);
        let else_value = self.lower(else_expr)?;
        self.builder.ins().jump(merge_block, &[else_value]);

        self.builder.switch_to_block(merge_block);
        self.builder.seal_block(merge_block);
        Ok(merged)
    }

    fn lower_for(
        &mut self,
        name: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
    ) -> JitResult<Value> {
        let start = self.lower(start)?;
        let var = self.fresh_var();
        self.builder.def_var(var, start);
        let shadowed = self.scope.insert(name.to_string(), var);

        let loop_block = self.builder.create_block();
        let exit_block = self.builder.create_block();
        self.builder.ins().jump(loop_block, &[]);
        self.builder.switch_to_block(loop_block);

        self.lower(body)?;
        let step = match step {
            Some(s) => self.lower(s)?,
            None => self.builder.ins().f64const(1.0),
        };
        let end = self.lower(end)?;
        let current = self.builder.use_var(var);
        let next = self.builder.ins().fadd(current, step);
        self.builder.def_var(var, next);
        let again = self.is_true(end);
        self.builder
            .ins()
            .brif(again, loop_block, &[], exit_block, &[]);

        self.builder.seal_block(loop_block);
        self.builder.switch_to_block(exit_block);
        self.builder.seal_block(exit_block);

        match shadowed {
            Some(old) => self.scope.insert(name.to_string(), old),
            None => self.scope.remove(name),
        };
        Ok(self.builder.ins().f64const(0.0))
    }
}
