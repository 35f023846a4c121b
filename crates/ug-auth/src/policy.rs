//! Domain allow-list policy
//!
//! The only authorization decision this service makes: is the verified
//! email's domain on the configured allow-list?

use std::collections::HashSet;

use crate::identity::UserIdentity;

/// Immutable email-domain allow-list.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    allowed: HashSet<String>,
}

impl DomainPolicy {
    /// Build a policy from configured domains. Entries are lowercased
    /// and trimmed; empty entries are dropped.
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed }
    }

    /// Decide whether this identity may authenticate.
    ///
    /// Unverified emails are rejected before the domain is even looked
    /// at. The domain is everything after the last `@`, lowercased.
    pub fn authorize(&self, identity: &UserIdentity) -> bool {
        if !identity.email_verified {
            return false;
        }

        match Self::email_domain(&identity.email) {
            Some(domain) => self.allowed.contains(&domain),
            None => false,
        }
    }

    /// Extract the domain part of an email address, lowercased.
    /// Returns None when there is no `@` or the domain is empty.
    pub fn email_domain(email: &str) -> Option<String> {
        let at = email.rfind('@')?;
        let domain = &email[at + 1..];
        if domain.is_empty() {
            return None;
        }
        Some(domain.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}
