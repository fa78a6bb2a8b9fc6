use sqlx::PgConnection;

/// Something which can hand out access to a live database connection
pub trait ConnectionHandle: Send {
    fn borrow_connection(&mut self) -> &mut PgConnection;
}

/// Provides access to the systems outside this service (currently just the database) so
/// driven adapters don't need to know where their connections come from
pub trait ExternalConnectivity: Send {
    type DbHandle<'cxn_borrow>: ConnectionHandle
    where
        Self: 'cxn_borrow;

    async fn database_cxn(&mut self) -> Result<Self::DbHandle<'_>, anyhow::Error>;
}

/// Implemented by an [ExternalConnectivity] which can begin a database transaction. Every statement
/// issued through the returned handle runs inside the same transaction, and nothing becomes
/// visible until [TransactionHandle::commit] is called. Dropping the handle rolls back.
pub trait Transactable {
    type Handle: ExternalConnectivity + TransactionHandle;

    async fn start_transaction(&self) -> Result<Self::Handle, anyhow::Error>;
}

/// A connectivity handle with an open transaction that can be committed
pub trait TransactionHandle {
    async fn commit(self) -> Result<(), anyhow::Error>;
}

/// Shorthand for connectivity that can be used both directly and transactionally
pub trait TransactableExternalConnectivity: ExternalConnectivity + Transactable {}

impl<T> TransactableExternalConnectivity for T where T: ExternalConnectivity + Transactable {}
