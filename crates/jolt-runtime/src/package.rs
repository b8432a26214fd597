use jolt_core::{JavaError, JavaResult};

use crate::class::JavaClass;
use crate::runtime::JavaRuntime;

/// A package namespace. Members are probed lazily, so a package value says
/// nothing about whether the package exists.
#[derive(Clone, Debug)]
pub struct JavaPackage {
    runtime: JavaRuntime,
    name: String,
}

/// What a name inside a package refers to.
#[derive(Clone, Debug)]
pub enum PackageMember {
    Class(JavaClass),
    Package(JavaPackage),
}

impl JavaPackage {
    pub(crate) fn new(runtime: JavaRuntime, name: String) -> Self {
        JavaPackage { runtime, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn qualify(&self, name: &str) -> String {
        if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        }
    }

    /// The class `name` in this package if there is one, otherwise the
    /// sub-package `name`.
    pub fn member(&self, name: &str) -> JavaResult<PackageMember> {
        let qualified = self.qualify(name);
        match self.runtime.try_find_class(&qualified)? {
            Some(class) => Ok(PackageMember::Class(class)),
            None => Ok(PackageMember::Package(JavaPackage::new(self.runtime.clone(), qualified))),
        }
    }

    /// The class `name` in this package.
    pub fn class(&self, name: &str) -> JavaResult<JavaClass> {
        let qualified = self.qualify(name);
        self.runtime
            .try_find_class(&qualified)?
            .ok_or(JavaError::ClassNotFound(qualified))
    }

    pub fn package(&self, name: &str) -> JavaPackage {
        JavaPackage::new(self.runtime.clone(), self.qualify(name))
    }
}

impl PackageMember {
    pub fn as_class(&self) -> Option<&JavaClass> {
        match self {
            PackageMember::Class(class) => Some(class),
            PackageMember::Package(_) => None,
        }
    }

    pub fn as_package(&self) -> Option<&JavaPackage> {
        match self {
            PackageMember::Package(package) => Some(package),
            PackageMember::Class(_) => None,
        }
    }
}
