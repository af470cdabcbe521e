//! SeaORM entity models
//!
//! Every table uses application-assigned integer keys
//! (`auto_increment = false`). Instance-level tables carry the owning
//! corpus and the creating user.

mod user;
mod corpus;
mod disambiguation_model;
mod paper;
mod paper_instance;
mod instance_metadatum;
mod instance_identifier;
mod author;
mod author_instance;
mod institution;
mod institution_instance;
mod affiliation_instance;
mod author_identity;
mod institution_identity;
mod paper_identity;
mod affiliation;

/// Rows are primary records unless flagged as citation stubs
fn default_concrete() -> bool {
    true
}

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use corpus::{
    Entity as CorpusEntity,
    Model as Corpus,
    ActiveModel as CorpusActiveModel,
    Column as CorpusColumn,
    CorpusSource,
};

pub use disambiguation_model::{
    Entity as DisambiguationModelEntity,
    Model as DisambiguationModel,
    ActiveModel as DisambiguationModelActiveModel,
    Column as DisambiguationModelColumn,
};

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use paper_instance::{
    Entity as PaperInstanceEntity,
    Model as PaperInstance,
    ActiveModel as PaperInstanceActiveModel,
    Column as PaperInstanceColumn,
};

pub use instance_metadatum::{
    Entity as InstanceMetadatumEntity,
    Model as InstanceMetadatum,
    ActiveModel as InstanceMetadatumActiveModel,
    Column as InstanceMetadatumColumn,
};

pub use instance_identifier::{
    Entity as InstanceIdentifierEntity,
    Model as InstanceIdentifier,
    ActiveModel as InstanceIdentifierActiveModel,
    Column as InstanceIdentifierColumn,
};

pub use author::{
    Entity as AuthorEntity,
    Model as Author,
    ActiveModel as AuthorActiveModel,
    Column as AuthorColumn,
};

pub use author_instance::{
    Entity as AuthorInstanceEntity,
    Model as AuthorInstance,
    ActiveModel as AuthorInstanceActiveModel,
    Column as AuthorInstanceColumn,
};

pub use institution::{
    Entity as InstitutionEntity,
    Model as Institution,
    ActiveModel as InstitutionActiveModel,
    Column as InstitutionColumn,
};

pub use institution_instance::{
    Entity as InstitutionInstanceEntity,
    Model as InstitutionInstance,
    ActiveModel as InstitutionInstanceActiveModel,
    Column as InstitutionInstanceColumn,
};

pub use affiliation_instance::{
    Entity as AffiliationInstanceEntity,
    Model as AffiliationInstance,
    ActiveModel as AffiliationInstanceActiveModel,
    Column as AffiliationInstanceColumn,
};

pub use author_identity::{
    Entity as AuthorIdentityEntity,
    Model as AuthorIdentity,
    ActiveModel as AuthorIdentityActiveModel,
    Column as AuthorIdentityColumn,
};

pub use institution_identity::{
    Entity as InstitutionIdentityEntity,
    Model as InstitutionIdentity,
    ActiveModel as InstitutionIdentityActiveModel,
    Column as InstitutionIdentityColumn,
};

pub use paper_identity::{
    Entity as PaperIdentityEntity,
    Model as PaperIdentity,
    ActiveModel as PaperIdentityActiveModel,
    Column as PaperIdentityColumn,
};

pub use affiliation::{
    Entity as AffiliationEntity,
    Model as Affiliation,
    ActiveModel as AffiliationActiveModel,
    Column as AffiliationColumn,
};
