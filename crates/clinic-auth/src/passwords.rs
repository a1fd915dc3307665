//! 密码哈希
//!
//! 使用 PBKDF2 的 PHC 字符串格式存储密码，盐值随机生成。

use clinic_core::{ClinicError, Result};
use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;

/// 生成密码哈希
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Pbkdf2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| ClinicError::Internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// 校验密码
///
/// 哈希串格式非法按校验失败处理，不向调用方暴露原因。
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Pbkdf2.verify_password(plain.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("s3cret").unwrap();
        let b = hash_password("s3cret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!verify_password("s3cret", "not-a-phc-string"));
    }
}
