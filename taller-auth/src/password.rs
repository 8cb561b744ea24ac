use anyhow::Result;
use taller_core::TallerError;

/// bcrypt hashing, run off the async executor.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: bcrypt::DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| TallerError::internal("Error al procesar la contraseña").with_source(e.into()).into_anyhow())?
            .map_err(|e| TallerError::internal("Error al procesar la contraseña").with_source(e.into()).into_anyhow())
    }

    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await?
            .map_err(|e| anyhow::anyhow!(e.to_string()))
    }
}
