use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型键：以 `TypeId` 判等，附带类型名用于日志与错误信息
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 请求键：使用 (请求类型, 响应类型) 组合，避免相同请求不同返回类型的冲突
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub request: TypeKey,
    pub response: TypeKey,
}

impl RequestKey {
    pub fn of<Q: 'static, R: 'static>() -> Self {
        Self {
            request: TypeKey::of::<Q>(),
            response: TypeKey::of::<R>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct A;
    struct B;

    #[test]
    fn keys_compare_by_type_identity() {
        assert_eq!(TypeKey::of::<A>(), TypeKey::of::<A>());
        assert_ne!(TypeKey::of::<A>(), TypeKey::of::<B>());
        assert!(TypeKey::of::<A>().name().ends_with("A"));

        let mut set = HashSet::new();
        set.insert(RequestKey::of::<A, B>());
        assert!(set.contains(&RequestKey::of::<A, B>()));
        assert!(!set.contains(&RequestKey::of::<B, A>()));
    }
}
