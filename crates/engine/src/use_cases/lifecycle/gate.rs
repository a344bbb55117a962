//! Authorization gate.
//!
//! Pure decisions over the calling principal. Ownership is not decided here:
//! "mine" listings filter rather than reject.

use questline_domain::{Principal, Role};

use super::error::ResourceError;

/// Fails with `Unauthorized` when no principal is attached.
pub fn requires_authentication(principal: Option<&Principal>) -> Result<&Principal, ResourceError> {
    principal.ok_or(ResourceError::Unauthorized)
}

/// Fails with `Forbidden` unless the principal's role meets `required`.
pub fn requires_role(principal: &Principal, required: Role) -> Result<(), ResourceError> {
    if principal.has_role(required) {
        Ok(())
    } else {
        Err(ResourceError::Forbidden { required })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Read,
    Replace,
    Patch,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Role(Role),
}

/// Requirement per lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    list: Requirement,
    create: Requirement,
    read: Requirement,
    replace: Requirement,
    patch: Requirement,
    destroy: Requirement,
}

impl AccessPolicy {
    /// Every operation needs a principal; destroy needs an admin.
    pub fn standard() -> Self {
        Self {
            list: Requirement::Authenticated,
            create: Requirement::Authenticated,
            read: Requirement::Authenticated,
            replace: Requirement::Authenticated,
            patch: Requirement::Authenticated,
            destroy: Requirement::Role(Role::Admin),
        }
    }

    pub fn requirement(&self, operation: Operation) -> Requirement {
        match operation {
            Operation::List => self.list,
            Operation::Create => self.create,
            Operation::Read => self.read,
            Operation::Replace => self.replace,
            Operation::Patch => self.patch,
            Operation::Destroy => self.destroy,
        }
    }

    pub fn authorize<'a>(
        &self,
        operation: Operation,
        principal: Option<&'a Principal>,
    ) -> Result<&'a Principal, ResourceError> {
        let principal = requires_authentication(principal)?;
        if let Requirement::Role(role) = self.requirement(operation) {
            requires_role(principal, role)?;
        }
        Ok(principal)
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_domain::UserId;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), role)
    }

    #[test]
    fn anonymous_callers_are_unauthorized_everywhere() {
        let policy = AccessPolicy::standard();
        for operation in [Operation::List, Operation::Read, Operation::Destroy] {
            let err = policy.authorize(operation, None).unwrap_err();
            assert!(matches!(err, ResourceError::Unauthorized));
        }
    }

    #[test]
    fn destroy_requires_admin() {
        let policy = AccessPolicy::standard();
        let user = principal(Role::User);
        let admin = principal(Role::Admin);

        let err = policy.authorize(Operation::Destroy, Some(&user)).unwrap_err();
        assert!(matches!(err, ResourceError::Forbidden { required: Role::Admin }));
        assert!(policy.authorize(Operation::Destroy, Some(&admin)).is_ok());
        assert!(policy.authorize(Operation::Patch, Some(&user)).is_ok());
    }
}
