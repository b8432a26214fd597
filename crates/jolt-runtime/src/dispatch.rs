//! Generic method invocation shared by the class, object and array proxies.
//!
//! Each proxy supplies its candidate members and how to call one; marshaling,
//! overload resolution and result wrapping happen here.

use std::sync::Arc;

use jolt_core::{Candidate, JavaError, JavaResult, JavaType, resolve};

use crate::env::Env;
use crate::marshal;
use crate::reflect::Member;
use crate::runtime::Runtime;
use crate::sys::jvalue;
use crate::value::Value;

pub(crate) trait Dispatch {
    fn runtime(&self) -> &Arc<Runtime>;

    /// Name used in "member not found" errors.
    fn describe(&self) -> String;

    /// The members an invocation of `name` may select from, in declaration
    /// order.
    fn candidates<'a>(&'a self, env: &Env<'_>, name: &str) -> JavaResult<Vec<&'a Member>>;

    /// The member name `name` resolves under. Pseudo-methods map onto a
    /// different member name.
    fn member_name<'n>(&self, name: &'n str) -> &'n str {
        name
    }

    fn call(&self, env: &Env<'_>, member: &Member, args: &[jvalue]) -> JavaResult<jvalue>;

    fn wrap_result(&self, env: &Env<'_>, member: &Member, raw: jvalue) -> JavaResult<Value> {
        marshal::return_value(self.runtime(), env, member.return_type(), raw)
    }
}

/// Resolve and invoke `name` on `target` with `args`.
pub(crate) fn invoke<D: Dispatch + ?Sized>(target: &D, name: &str, args: &[Value]) -> JavaResult<Value> {
    let runtime = target.runtime();
    let env = runtime.env()?;
    env.with_local_frame(|| {
        let arguments = marshal::arguments(runtime, &env, args)?;
        let types: Vec<JavaType> = arguments.iter().map(|argument| argument.ty.clone()).collect();
        let candidates = target.candidates(&env, name)?;

        let oracle = runtime.oracle(&env);
        let resolution = resolve(candidates, target.member_name(name), &types, &oracle)?;
        let Some((member, plan)) = resolution.found() else {
            return Err(JavaError::member_not_found(target.describe(), signature(name, &types)));
        };

        let slots = marshal::prepare(runtime, &env, &arguments, member.parameter_types(), &plan)?;
        let raw = target.call(&env, member, &slots)?;
        target.wrap_result(&env, member, raw)
    })
}

fn signature(name: &str, types: &[JavaType]) -> String {
    let rendered: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("{}({})", name, rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolt_core::PrimitiveKind;

    #[test]
    fn test_signature_rendering() {
        let types = [
            JavaType::Primitive(PrimitiveKind::Int),
            JavaType::Null,
            JavaType::array_of(JavaType::string()),
        ];
        assert_eq!(signature("put", &types), "put(int, null, java.lang.String[])");
        assert_eq!(signature("size", &[]), "size()");
    }
}
