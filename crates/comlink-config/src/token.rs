// SPDX-License-Identifier: MIT OR Apache-2.0
//! `sdkAuthToken` validation (spec §6): "prefix `sfs_`, hex body, hex
//! suffix; invalid -> ignored with warning."

/// Check whether `token` matches the `sfs_<hex body>_<hex suffix>` shape.
///
/// The body and suffix are separated by the last underscore in the
/// remainder after the `sfs_` prefix, mirroring the common
/// `<prefix>_<payload>_<checksum>` token shapes (comparable to e.g.
/// Stripe's `sk_live_<payload>`): a prefix, a hex payload, and a short
/// hex suffix used as a cheap integrity check before the token is ever
/// sent over the wire.
#[must_use]
pub fn is_valid_sdk_auth_token(token: &str) -> bool {
    let Some(rest) = token.strip_prefix("sfs_") else {
        return false;
    };
    let Some((body, suffix)) = rest.rsplit_once('_') else {
        return false;
    };
    !body.is_empty()
        && !suffix.is_empty()
        && body.bytes().all(|b| b.is_ascii_hexdigit())
        && suffix.bytes().all(|b| b.is_ascii_hexdigit())
}
