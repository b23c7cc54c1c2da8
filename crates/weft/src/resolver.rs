//! Classifies raw member tokens (`Name`, `Owner.Name`, `p:Owner.Name`) into
//! resolved [`Member`]s.

use std::sync::Arc;

use crate::error::ParseErrorKind;
use crate::member::Member;
use crate::registry::NamespaceScope;
use crate::types::TypeDescriptor;

// ── MemberToken ───────────────────────────────────────────────────────────

/// A member token split into its optional prefix, optional owner and name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberToken<'a> {
    pub prefix: Option<&'a str>,
    pub owner: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> MemberToken<'a> {
    pub fn parse(raw: &'a str) -> Result<Self, ParseErrorKind> {
        let malformed = || ParseErrorKind::MalformedMemberToken { token: raw.to_string() };

        let (prefix, local) = match raw.split_once(':') {
            Some((p, l)) if !p.is_empty() && !l.contains(':') => (Some(p), l),
            Some(_) => return Err(malformed()),
            None => (None, raw),
        };

        let mut parts = local.split('.');
        let (owner, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => (None, name),
            (Some(owner), Some(name), None) if !owner.is_empty() => (Some(owner), name),
            _ => return Err(malformed()),
        };
        if name.is_empty() {
            return Err(malformed());
        }
        Ok(Self { prefix, owner, name })
    }

    pub fn is_dotted(&self) -> bool {
        self.owner.is_some()
    }
}

// ── Resolution ────────────────────────────────────────────────────────────

/// Resolve an attribute token against the element it appears on.
///
/// Undotted tokens are standard members of `containing`; a prefix on one must
/// map to `containing`'s own namespace. Dotted tokens name
/// an owner type, looked up under the token's own prefix or, without one,
/// under `element_prefix`.
pub fn resolve_member(
    containing: &Arc<TypeDescriptor>,
    raw: &str,
    scope: &NamespaceScope<'_>,
    element_prefix: &str,
) -> Result<Member, ParseErrorKind> {
    let token = MemberToken::parse(raw)?;
    match token.owner {
        None => {
            let namespace = containing.key().namespace.as_str();
            if token.prefix.is_some_and(|p| scope.uri_for_prefix(p) != Some(namespace)) {
                return Err(ParseErrorKind::UnknownMember {
                    type_name: containing.name().to_string(),
                    token: raw.to_string(),
                });
            }
            standard(containing, token.name)
        }
        Some(owner_name) => {
            let prefix = token.prefix.unwrap_or(element_prefix);
            let owner = scope.type_for_prefix(prefix, owner_name)?;
            attached(&owner, token.name)
        }
    }
}

/// Resolve a property element's `Owner.Member` local name.
///
/// When the owner is the enclosing element's own type this is a standard
/// member; any other owner makes it attached. Returns the owner with the member.
pub fn resolve_property_element(
    parent: &Arc<TypeDescriptor>,
    prefix: &str,
    local_name: &str,
    scope: &NamespaceScope<'_>,
) -> Result<(Arc<TypeDescriptor>, Member), ParseErrorKind> {
    let token = MemberToken::parse(local_name)?;
    let Some(owner_name) = token.owner else {
        return Err(ParseErrorKind::MalformedMemberToken { token: local_name.to_string() });
    };
    let owner = scope.type_for_prefix(prefix, owner_name)?;
    let member = if owner.key() == parent.key() {
        standard(parent, token.name)?
    } else {
        attached(&owner, token.name)?
    };
    Ok((owner, member))
}

fn standard(ty: &TypeDescriptor, name: &str) -> Result<Member, ParseErrorKind> {
    cached(ty, false, name, Member::from_standard)
}

fn attached(owner: &TypeDescriptor, name: &str) -> Result<Member, ParseErrorKind> {
    cached(owner, true, name, Member::from_attached)
}

fn cached(
    ty: &TypeDescriptor,
    attached: bool,
    name: &str,
    resolve: fn(&TypeDescriptor, &str) -> Result<Member, ParseErrorKind>,
) -> Result<Member, ParseErrorKind> {
    if let Some(member) = ty.cached_member(attached, name) {
        return Ok(member);
    }
    let member = resolve(ty, name)?;
    ty.cache_member(attached, &member);
    Ok(member)
}
